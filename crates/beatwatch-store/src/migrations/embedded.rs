pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All migrations, oldest first
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_hierarchy_and_people",
            sql: include_str!("../../migrations/001_hierarchy_and_people.sql"),
        },
        Migration {
            id: "002_workflow_entities",
            sql: include_str!("../../migrations/002_workflow_entities.sql"),
        },
        Migration {
            id: "003_notification_outbox",
            sql: include_str!("../../migrations/003_notification_outbox.sql"),
        },
    ]
}
