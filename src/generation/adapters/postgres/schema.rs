//! Diesel schema for generation tasks.

diesel::table! {
    /// One row per generation task.
    generation_tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owner.
        user_id -> Uuid,
        /// Mode name.
        #[max_length = 32]
        generation_mode -> Varchar,
        /// Prompt sent to the provider.
        prompt -> Text,
        /// Optional negative prompt.
        negative_prompt -> Nullable<Text>,
        /// `16:9` or `9:16`.
        #[max_length = 8]
        aspect_ratio -> Varchar,
        /// `720p` or `1080p`.
        #[max_length = 8]
        resolution -> Varchar,
        /// Seconds produced by this job.
        duration_seconds -> Int4,
        /// Realised length including prior extensions.
        chain_duration_seconds -> Int4,
        /// Person-generation policy.
        #[max_length = 16]
        person_generation -> Varchar,
        /// Reference image URLs.
        reference_images -> Nullable<Jsonb>,
        /// Opening frame URL.
        first_frame_url -> Nullable<Text>,
        /// Closing frame URL.
        last_frame_url -> Nullable<Text>,
        /// Source task of an extension.
        source_video_id -> Nullable<Uuid>,
        /// Credits charged.
        credit_cost -> BigInt,
        /// Lifecycle status.
        #[max_length = 16]
        status -> Varchar,
        /// Provider operation handle.
        #[max_length = 255]
        operation_id -> Nullable<Varchar>,
        /// Provider handle of the produced video.
        provider_video_uri -> Nullable<Text>,
        /// Storage key of the stored video.
        asset_location -> Nullable<Text>,
        /// Size of the stored video.
        asset_size_bytes -> Nullable<BigInt>,
        /// Hex SHA-256 of the stored video.
        #[max_length = 64]
        asset_sha256 -> Nullable<Varchar>,
        /// Failure code.
        #[max_length = 64]
        error_code -> Nullable<Varchar>,
        /// Failure detail.
        error_message -> Nullable<Text>,
        /// Whether the charge was returned.
        refunded -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Terminal timestamp.
        completed_at -> Nullable<Timestamptz>,
    }
}
