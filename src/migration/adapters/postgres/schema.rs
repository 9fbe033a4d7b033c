//! Diesel schema for migration persistence.

diesel::table! {
    /// Migration records with sealed credentials.
    migrations (id) {
        /// Sequential migration identifier.
        id -> Int8,
        /// `organization/project/repository` on the source host.
        #[max_length = 512]
        source_location -> Varchar,
        /// `user:<login>` or `org:<name>` on the target host.
        #[max_length = 255]
        target_location -> Varchar,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Percentage complete.
        progress -> Int2,
        /// Failure description.
        error -> Nullable<Text>,
        /// Sealed source-host credential.
        source_credential -> Text,
        /// Sealed target-host credential.
        target_credential -> Text,
        /// First transition out of pending.
        started_at -> Nullable<Timestamptz>,
        /// Successful completion.
        completed_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
