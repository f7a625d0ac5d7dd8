// Diesel table definitions. Kept in sync with the cetane migrations in
// `crate::migrations` (see tests/migration_parity.rs).

diesel::table! {
    users (id) {
        id -> BigInt,
        username -> Text,
        password_hash -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    artifacts (id) {
        id -> BigInt,
        kind -> Text,
        name -> Text,
        file_path -> Text,
        content_hash -> Text,
        content_type -> Text,
        file_size -> BigInt,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(artifacts, users);
