//! Row-to-model mapping between the SQLite relational schema and the
//! cm-core domain models.

use chrono::{DateTime, Utc};
use cm_core::{Comment, Community, Notification, NotificationKind, Post, User, Vote};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

pub(crate) fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

pub(crate) fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

pub(crate) fn opt_uuid_to_blob(id: Option<Uuid>) -> Option<Vec<u8>> {
    id.map(uuid_to_blob)
}

/// The viewer's vote projection from the `vote_user` / `vote_created`
/// LEFT JOIN columns: zero or one entries.
fn viewer_votes(row: &SqliteRow, target_id: Uuid) -> Vec<Vote> {
    let voter: Option<Vec<u8>> = row.try_get("vote_user").ok().flatten();
    let created: Option<DateTime<Utc>> = row.try_get("vote_created").ok().flatten();
    match (voter, created) {
        (Some(user), Some(created_at)) => vec![Vote {
            user_id: blob_to_uuid(&user),
            target_id,
            created_at,
        }],
        _ => Vec::new(),
    }
}

pub(crate) fn map_user(row: &SqliteRow) -> User {
    User {
        id: blob_to_uuid(&row.get::<Vec<u8>, _>("id")),
        name: row.get("name"),
        image: row.get("image"),
        banned_until: row.get("banned_until"),
        is_global_moderator: row.get("is_global_moderator"),
        created_at: row.get("created_at"),
    }
}

/// Maps a community row; the moderator roster travels separately.
pub(crate) fn map_community(row: &SqliteRow, moderators: Vec<Uuid>) -> Community {
    let rules_json: String = row.get("rules");
    Community {
        id: blob_to_uuid(&row.get::<Vec<u8>, _>("id")),
        name: row.get("name"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        logo_url: row.get("logo_url"),
        rules: serde_json::from_str(&rules_json).unwrap_or_default(),
        owner_id: blob_to_uuid(&row.get::<Vec<u8>, _>("owner_id")),
        moderators,
        created_at: row.get("created_at"),
    }
}

pub(crate) fn map_post(row: &SqliteRow) -> Post {
    let id = blob_to_uuid(&row.get::<Vec<u8>, _>("id"));
    Post {
        id,
        title: row.get("title"),
        content: row.get("content"),
        community_id: blob_to_uuid(&row.get::<Vec<u8>, _>("community_id")),
        community_name: row.get("community_name"),
        author_id: blob_to_uuid(&row.get::<Vec<u8>, _>("author_id")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        is_deleted: row.get("is_deleted"),
        vote_count: row.get("vote_count"),
        comment_count: row.get("comment_count"),
        votes: viewer_votes(row, id),
    }
}

pub(crate) fn map_comment(row: &SqliteRow) -> Comment {
    let id = blob_to_uuid(&row.get::<Vec<u8>, _>("id"));
    let parent: Option<Vec<u8>> = row.get("parent_id");
    Comment {
        id,
        content: row.get("content"),
        post_id: blob_to_uuid(&row.get::<Vec<u8>, _>("post_id")),
        parent_id: parent.map(|b| blob_to_uuid(&b)),
        author_id: blob_to_uuid(&row.get::<Vec<u8>, _>("author_id")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        is_deleted: row.get("is_deleted"),
        vote_count: row.get("vote_count"),
        reply_count: row.get("reply_count"),
        votes: viewer_votes(row, id),
    }
}

pub(crate) fn map_notification(row: &SqliteRow) -> Notification {
    let kind: String = row.get("kind");
    let comment: Option<Vec<u8>> = row.get("comment_id");
    Notification {
        id: blob_to_uuid(&row.get::<Vec<u8>, _>("id")),
        user_id: blob_to_uuid(&row.get::<Vec<u8>, _>("user_id")),
        actor_id: blob_to_uuid(&row.get::<Vec<u8>, _>("actor_id")),
        kind: kind.parse().unwrap_or(NotificationKind::PostReply),
        post_id: blob_to_uuid(&row.get::<Vec<u8>, _>("post_id")),
        comment_id: comment.map(|b| blob_to_uuid(&b)),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}
