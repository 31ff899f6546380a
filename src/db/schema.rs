/// Schema for the journal database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS team_members (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    color TEXT NOT NULL,
    jira_account_id TEXT,
    prep_notes TEXT
);

CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    member_id TEXT NOT NULL REFERENCES team_members(id),
    date TEXT NOT NULL,
    summary TEXT,
    morale_score INTEGER,
    growth_score INTEGER,
    morale_rationale TEXT,
    growth_rationale TEXT,
    tags TEXT,
    action_items_mine TEXT,
    action_items_theirs TEXT,
    notable_quotes TEXT,
    blockers TEXT,
    wins TEXT,
    private_note TEXT,
    transcript TEXT,
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_entries_member_date
    ON entries(member_id, date);

-- Generic result cache keyed by content fingerprint
CREATE TABLE IF NOT EXISTS cache (
    key TEXT NOT NULL,
    category TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (key, category)
);

CREATE INDEX IF NOT EXISTS idx_cache_created ON cache(created_at);
"#;
