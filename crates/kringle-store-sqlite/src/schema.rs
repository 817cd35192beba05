//! SQL schema for the Kringle SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS seasons (
    year          INTEGER PRIMARY KEY,  -- calendar year; immutable
    signups_start TEXT NOT NULL,        -- YYYY-MM-DD
    signups_end   TEXT NOT NULL,        -- exclusive
    ship_by       TEXT NOT NULL,
    gallery       TEXT
);

-- Users carry provider-assigned ids; this table never allocates one.
CREATE TABLE IF NOT EXISTS users (
    id           INTEGER PRIMARY KEY,
    username     TEXT NOT NULL UNIQUE,
    access_token TEXT NOT NULL,         -- rotated on every login
    is_oldfag    INTEGER NOT NULL DEFAULT 0,
    is_banned    INTEGER NOT NULL DEFAULT 0,
    first_login  TEXT NOT NULL,         -- ISO 8601 UTC
    last_login   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    id               INTEGER PRIMARY KEY,
    user_id          INTEGER NOT NULL REFERENCES users(id),
    year             INTEGER NOT NULL REFERENCES seasons(year),
    fullname         TEXT NOT NULL,
    postcode         TEXT NOT NULL,
    address          TEXT NOT NULL,
    giftee_id        INTEGER REFERENCES members(id),
    gift_sent_at     TEXT,              -- written once, never cleared
    gift_received_at TEXT,              -- written once, never cleared
    last_visit       TEXT NOT NULL,
    UNIQUE (user_id, year)
);

CREATE TABLE IF NOT EXISTS mails (
    id           INTEGER PRIMARY KEY,
    sender_id    INTEGER NOT NULL REFERENCES members(id),
    recipient_id INTEGER NOT NULL REFERENCES members(id),
    body         TEXT NOT NULL,
    sent_at      TEXT NOT NULL,
    read_at      TEXT
);

-- Append-only; survives cache clears and season resets.
CREATE TABLE IF NOT EXISTS audit_log (
    id          INTEGER PRIMARY KEY,
    action      TEXT NOT NULL,          -- snake_case AuditAction
    actor       INTEGER,
    target_user INTEGER,
    year        INTEGER,
    ip          TEXT,
    at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS members_year_idx    ON members(year);
CREATE INDEX IF NOT EXISTS members_giftee_idx  ON members(giftee_id);
CREATE INDEX IF NOT EXISTS users_token_idx     ON users(access_token);
CREATE INDEX IF NOT EXISTS mails_pair_idx      ON mails(sender_id, recipient_id);

PRAGMA user_version = 1;
";
