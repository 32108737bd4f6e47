//! # cm-db-sqlite
//!
//! SQLite implementation of `ForumRepo`. Maps the relational schema to the
//! cm-core domain models, keeps the denormalized vote/comment counts in
//! step inside transactions, and implements cursor pagination as keyset
//! queries over time-ordered UUID v7 blobs.

mod map;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use cm_core::{
    Comment, CommentNode, Community, Notification, Page, Post, PostFilter, PostSort,
    SearchResults, User, Vote, VoteAction,
};
use cm_core::{ForumRepo, RuleList};

use map::{
    blob_to_uuid, map_comment, map_community, map_notification, map_post, map_user,
    opt_uuid_to_blob, uuid_to_blob,
};

/// Levels of replies loaded eagerly beneath a comment page (root + 3).
/// Deeper levels are fetched lazily with the depth-4 comment as the root.
const EAGER_REPLY_LEVELS: usize = 3;

/// Cap applied to each entity class in `search`.
const SEARCH_LIMIT: i64 = 12;

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.community_id, \
     c.name AS community_name, p.author_id, p.created_at, p.updated_at, \
     p.is_deleted, p.vote_count, p.comment_count, \
     v.user_id AS vote_user, v.created_at AS vote_created \
     FROM posts p \
     JOIN communities c ON c.id = p.community_id \
     LEFT JOIN post_votes v ON v.post_id = p.id AND v.user_id = ?";

const COMMENT_SELECT: &str = "SELECT c.id, c.content, c.post_id, c.parent_id, c.author_id, \
     c.created_at, c.updated_at, c.is_deleted, c.vote_count, c.reply_count, \
     v.user_id AS vote_user, v.created_at AS vote_created \
     FROM comments c \
     LEFT JOIN comment_votes v ON v.comment_id = c.id AND v.user_id = ?";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        image TEXT,
        banned_until TEXT,
        is_global_moderator INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS communities (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        image_url TEXT,
        logo_url TEXT,
        rules TEXT NOT NULL DEFAULT '[]',
        owner_id BLOB NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS moderators (
        community_id BLOB NOT NULL,
        user_id BLOB NOT NULL,
        PRIMARY KEY (community_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id BLOB PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        community_id BLOB NOT NULL,
        author_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        vote_count INTEGER NOT NULL DEFAULT 0,
        comment_count INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_posts_community ON posts (community_id, id)",
    "CREATE INDEX IF NOT EXISTS idx_posts_vote_count ON posts (vote_count, id)",
    "CREATE TABLE IF NOT EXISTS comments (
        id BLOB PRIMARY KEY,
        content TEXT NOT NULL,
        post_id BLOB NOT NULL,
        parent_id BLOB,
        author_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        vote_count INTEGER NOT NULL DEFAULT 0,
        reply_count INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments (post_id, parent_id, id)",
    "CREATE TABLE IF NOT EXISTS post_votes (
        user_id BLOB NOT NULL,
        post_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )",
    "CREATE TABLE IF NOT EXISTS comment_votes (
        user_id BLOB NOT NULL,
        comment_id BLOB NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, comment_id)
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id BLOB PRIMARY KEY,
        user_id BLOB NOT NULL,
        actor_id BLOB NOT NULL,
        kind TEXT NOT NULL,
        post_id BLOB NOT NULL,
        comment_id BLOB,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id, id)",
];

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

impl SqliteForumRepo {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        // An in-memory database exists per connection; more than one pooled
        // connection would each see their own empty schema.
        let max_connections = if url.contains(":memory:") { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("schema ensured");
        Ok(())
    }

    async fn moderators_of(&self, community_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT user_id FROM moderators WHERE community_id = ?")
            .bind(uuid_to_blob(community_id))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| blob_to_uuid(&row.get::<Vec<u8>, _>("user_id")))
            .collect())
    }

    /// All direct children of `parents`, newest-first, with the viewer's
    /// vote projection.
    async fn children_of(
        &self,
        parents: &[Uuid],
        viewer_blob: Option<Vec<u8>>,
    ) -> anyhow::Result<Vec<Comment>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; parents.len()].join(", ");
        let sql =
            format!("{COMMENT_SELECT} WHERE c.parent_id IN ({placeholders}) ORDER BY c.id DESC");
        let mut query = sqlx::query(&sql).bind(viewer_blob);
        for parent in parents {
            query = query.bind(uuid_to_blob(*parent));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(map_comment).collect())
    }

    /// Ids of the whole subtree rooted at `id`, the root included.
    async fn subtree_ids(&self, id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let mut all = vec![id];
        let mut frontier = vec![id];
        while !frontier.is_empty() {
            let placeholders = vec!["?"; frontier.len()].join(", ");
            let sql = format!("SELECT id FROM comments WHERE parent_id IN ({placeholders})");
            let mut query = sqlx::query(&sql);
            for parent in &frontier {
                query = query.bind(uuid_to_blob(*parent));
            }
            frontier = query
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| blob_to_uuid(&row.get::<Vec<u8>, _>("id")))
                .collect();
            all.extend(&frontier);
        }
        Ok(all)
    }
}

/// Reassembles flat levels into nested nodes; per-parent reply order is the
/// fetch order (newest-first).
fn assemble_nodes(roots: Vec<Comment>, descendants: Vec<Comment>) -> Vec<CommentNode> {
    let mut by_parent: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for comment in descendants {
        if let Some(parent) = comment.parent_id {
            by_parent.entry(parent).or_default().push(comment);
        }
    }

    fn build(comment: Comment, by_parent: &mut HashMap<Uuid, Vec<Comment>>) -> CommentNode {
        let replies = by_parent
            .remove(&comment.id)
            .unwrap_or_default()
            .into_iter()
            .map(|reply| build(reply, by_parent))
            .collect();
        CommentNode { comment, replies }
    }

    roots
        .into_iter()
        .map(|comment| build(comment, &mut by_parent))
        .collect()
}

#[async_trait]
impl ForumRepo for SqliteForumRepo {
    // ── Users ────────────────────────────────────────────────────────────

    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, image, banned_until, is_global_moderator, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(user.id))
        .bind(user.name)
        .bind(user.image)
        .bind(user.banned_until)
        .bind(user.is_global_moderator)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_user))
    }

    async fn ban_user(&self, user_id: Uuid, until: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET banned_until = ? WHERE id = ?")
            .bind(until)
            .bind(uuid_to_blob(user_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Communities ──────────────────────────────────────────────────────

    async fn create_community(&self, community: Community) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO communities (id, name, description, image_url, logo_url, rules, \
             owner_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(community.id))
        .bind(community.name)
        .bind(community.description)
        .bind(community.image_url)
        .bind(community.logo_url)
        .bind(serde_json::to_string(&community.rules)?)
        .bind(uuid_to_blob(community.owner_id))
        .bind(community.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_community(&self, name: &str) -> anyhow::Result<Option<Community>> {
        let row = sqlx::query("SELECT * FROM communities WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id = blob_to_uuid(&row.get::<Vec<u8>, _>("id"));
        let moderators = self.moderators_of(id).await?;
        Ok(Some(map_community(&row, moderators)))
    }

    async fn find_communities(&self, fragment: &str, limit: i64) -> anyhow::Result<Vec<Community>> {
        let rows = sqlx::query(
            "SELECT * FROM communities WHERE name LIKE '%' || ? || '%' ORDER BY name LIMIT ?",
        )
        .bind(fragment)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        // Listing results skip the moderator roster; the detail fetch fills it.
        Ok(rows.iter().map(|row| map_community(row, Vec::new())).collect())
    }

    async fn update_community_profile(
        &self,
        id: Uuid,
        description: Option<String>,
        image_url: Option<String>,
        logo_url: Option<String>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE communities SET description = ?, image_url = ?, logo_url = ? WHERE id = ?",
        )
        .bind(description)
        .bind(image_url)
        .bind(logo_url)
        .bind(uuid_to_blob(id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_community_rules(&self, id: Uuid, rules: RuleList) -> anyhow::Result<()> {
        sqlx::query("UPDATE communities SET rules = ? WHERE id = ?")
            .bind(serde_json::to_string(&rules)?)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_moderator(&self, community_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO moderators (community_id, user_id) VALUES (?, ?)")
            .bind(uuid_to_blob(community_id))
            .bind(uuid_to_blob(user_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_moderator(&self, community_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM moderators WHERE community_id = ? AND user_id = ?")
            .bind(uuid_to_blob(community_id))
            .bind(uuid_to_blob(user_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transfer_owner(&self, community_id: Uuid, new_owner: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE communities SET owner_id = ? WHERE id = ?")
            .bind(uuid_to_blob(new_owner))
            .bind(uuid_to_blob(community_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Posts ────────────────────────────────────────────────────────────

    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, title, content, community_id, author_id, created_at, \
             updated_at, is_deleted, vote_count, comment_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(post.id))
        .bind(post.title)
        .bind(post.content)
        .bind(uuid_to_blob(post.community_id))
        .bind(uuid_to_blob(post.author_id))
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.is_deleted)
        .bind(post.vote_count)
        .bind(post.comment_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolves soft-deleted posts too; only listings exclude them.
    async fn get_post(&self, id: Uuid, viewer: Option<Uuid>) -> anyhow::Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(opt_uuid_to_blob(viewer))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_post))
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        viewer: Option<Uuid>,
    ) -> anyhow::Result<Page<Post>> {
        let mut sql = format!("{POST_SELECT} WHERE p.is_deleted = 0");
        if filter.community.is_some() {
            sql.push_str(" AND c.name = ?");
        }
        // The time window bounds the hot sort only.
        let since = match filter.sort {
            PostSort::Hot => filter.window.since(Utc::now()),
            PostSort::New | PostSort::Moot => None,
        };
        if since.is_some() {
            sql.push_str(" AND p.created_at >= ?");
        }
        match filter.sort {
            PostSort::New => {
                if filter.cursor.is_some() {
                    sql.push_str(" AND p.id < ?");
                }
                sql.push_str(" ORDER BY p.id DESC");
            }
            PostSort::Hot => {
                if filter.cursor.is_some() {
                    sql.push_str(
                        " AND (p.vote_count < (SELECT vote_count FROM posts WHERE id = ?) \
                         OR (p.vote_count = (SELECT vote_count FROM posts WHERE id = ?) \
                         AND p.id < ?))",
                    );
                }
                sql.push_str(" ORDER BY p.vote_count DESC, p.id DESC");
            }
            PostSort::Moot => {
                if filter.cursor.is_some() {
                    sql.push_str(
                        " AND (p.comment_count < (SELECT comment_count FROM posts WHERE id = ?) \
                         OR (p.comment_count = (SELECT comment_count FROM posts WHERE id = ?) \
                         AND p.id < ?))",
                    );
                }
                sql.push_str(" ORDER BY p.comment_count DESC, p.id DESC");
            }
        }
        sql.push_str(" LIMIT ?");

        let mut query = sqlx::query(&sql).bind(opt_uuid_to_blob(viewer));
        if let Some(name) = &filter.community {
            query = query.bind(name);
        }
        if let Some(since) = since {
            query = query.bind(since);
        }
        if let Some(cursor) = filter.cursor {
            let blob = uuid_to_blob(cursor);
            query = match filter.sort {
                PostSort::New => query.bind(blob),
                PostSort::Hot | PostSort::Moot => {
                    query.bind(blob.clone()).bind(blob.clone()).bind(blob)
                }
            };
        }
        query = query.bind(filter.count);

        let rows = query.fetch_all(&self.pool).await?;
        let posts: Vec<Post> = rows.iter().map(map_post).collect();
        Ok(Page::from_batch(posts, filter.count as usize, |p| p.id))
    }

    async fn update_post(&self, id: Uuid, title: String, content: String) -> anyhow::Result<()> {
        sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(content)
            .bind(Utc::now())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_post_deleted(&self, id: Uuid, deleted: bool) -> anyhow::Result<()> {
        sqlx::query("UPDATE posts SET is_deleted = ? WHERE id = ?")
            .bind(deleted)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Moderator "nuke": the only physical delete on the post path.
    async fn nuke_post(&self, id: Uuid) -> anyhow::Result<()> {
        let blob = uuid_to_blob(id);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM comment_votes WHERE comment_id IN \
             (SELECT id FROM comments WHERE post_id = ?)",
        )
        .bind(blob.clone())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(blob.clone())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM post_votes WHERE post_id = ?")
            .bind(blob.clone())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(blob)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // ── Comments ─────────────────────────────────────────────────────────

    /// Creates the comment and moves the denormalized counters in the same
    /// transaction, so a failed insert never leaves a phantom count.
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO comments (id, content, post_id, parent_id, author_id, created_at, \
             updated_at, is_deleted, vote_count, reply_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(comment.id))
        .bind(comment.content)
        .bind(uuid_to_blob(comment.post_id))
        .bind(opt_uuid_to_blob(comment.parent_id))
        .bind(uuid_to_blob(comment.author_id))
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .bind(comment.is_deleted)
        .bind(comment.vote_count)
        .bind(comment.reply_count)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(uuid_to_blob(comment.post_id))
            .execute(&mut *tx)
            .await?;
        if let Some(parent) = comment.parent_id {
            sqlx::query("UPDATE comments SET reply_count = reply_count + 1 WHERE id = ?")
                .bind(uuid_to_blob(parent))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_comment(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> anyhow::Result<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        let row = sqlx::query(&sql)
            .bind(opt_uuid_to_blob(viewer))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_comment))
    }

    async fn list_comments(
        &self,
        post_id: Uuid,
        root: Option<Uuid>,
        count: i64,
        cursor: Option<Uuid>,
        viewer: Option<Uuid>,
    ) -> anyhow::Result<Page<CommentNode>> {
        let viewer_blob = opt_uuid_to_blob(viewer);

        let mut sql = format!("{COMMENT_SELECT} WHERE c.post_id = ?");
        match root {
            Some(_) => sql.push_str(" AND c.parent_id = ?"),
            None => sql.push_str(" AND c.parent_id IS NULL"),
        }
        if cursor.is_some() {
            sql.push_str(" AND c.id < ?");
        }
        sql.push_str(" ORDER BY c.id DESC LIMIT ?");

        let mut query = sqlx::query(&sql)
            .bind(viewer_blob.clone())
            .bind(uuid_to_blob(post_id));
        if let Some(root) = root {
            query = query.bind(uuid_to_blob(root));
        }
        if let Some(cursor) = cursor {
            query = query.bind(uuid_to_blob(cursor));
        }
        query = query.bind(count);

        let rows = query.fetch_all(&self.pool).await?;
        let roots: Vec<Comment> = rows.iter().map(map_comment).collect();

        let mut frontier: Vec<Uuid> = roots.iter().map(|c| c.id).collect();
        let mut descendants: Vec<Comment> = Vec::new();
        for _ in 0..EAGER_REPLY_LEVELS {
            if frontier.is_empty() {
                break;
            }
            let children = self.children_of(&frontier, viewer_blob.clone()).await?;
            frontier = children.iter().map(|c| c.id).collect();
            descendants.extend(children);
        }

        let nodes = assemble_nodes(roots, descendants);
        Ok(Page::from_batch(nodes, count as usize, |n| n.comment.id))
    }

    async fn update_comment(&self, id: Uuid, content: String) -> anyhow::Result<()> {
        sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_comment_deleted(&self, id: Uuid, deleted: bool) -> anyhow::Result<()> {
        sqlx::query("UPDATE comments SET is_deleted = ? WHERE id = ?")
            .bind(deleted)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn nuke_comment(&self, id: Uuid) -> anyhow::Result<()> {
        let Some(target) = self.get_comment(id, None).await? else {
            return Ok(());
        };
        let subtree = self.subtree_ids(id).await?;
        let placeholders = vec!["?"; subtree.len()].join(", ");

        let mut tx = self.pool.begin().await?;
        let delete_votes =
            format!("DELETE FROM comment_votes WHERE comment_id IN ({placeholders})");
        let mut query = sqlx::query(&delete_votes);
        for comment_id in &subtree {
            query = query.bind(uuid_to_blob(*comment_id));
        }
        query.execute(&mut *tx).await?;

        let delete_comments = format!("DELETE FROM comments WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&delete_comments);
        for comment_id in &subtree {
            query = query.bind(uuid_to_blob(*comment_id));
        }
        query.execute(&mut *tx).await?;

        sqlx::query("UPDATE posts SET comment_count = comment_count - ? WHERE id = ?")
            .bind(subtree.len() as i64)
            .bind(uuid_to_blob(target.post_id))
            .execute(&mut *tx)
            .await?;
        if let Some(parent) = target.parent_id {
            sqlx::query("UPDATE comments SET reply_count = reply_count - 1 WHERE id = ?")
                .bind(uuid_to_blob(parent))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ── Votes ────────────────────────────────────────────────────────────

    async fn set_post_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        action: VoteAction,
    ) -> anyhow::Result<Option<Vote>> {
        let mut tx = self.pool.begin().await?;
        let result = match action {
            VoteAction::Like => {
                let now = Utc::now();
                let inserted = sqlx::query(
                    "INSERT OR IGNORE INTO post_votes (user_id, post_id, created_at) \
                     VALUES (?, ?, ?)",
                )
                .bind(uuid_to_blob(user_id))
                .bind(uuid_to_blob(post_id))
                .bind(now)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 1 {
                    sqlx::query("UPDATE posts SET vote_count = vote_count + 1 WHERE id = ?")
                        .bind(uuid_to_blob(post_id))
                        .execute(&mut *tx)
                        .await?;
                }
                let row = sqlx::query(
                    "SELECT created_at FROM post_votes WHERE user_id = ? AND post_id = ?",
                )
                .bind(uuid_to_blob(user_id))
                .bind(uuid_to_blob(post_id))
                .fetch_one(&mut *tx)
                .await?;
                Some(Vote { user_id, target_id: post_id, created_at: row.get("created_at") })
            }
            VoteAction::Unlike => {
                let removed =
                    sqlx::query("DELETE FROM post_votes WHERE user_id = ? AND post_id = ?")
                        .bind(uuid_to_blob(user_id))
                        .bind(uuid_to_blob(post_id))
                        .execute(&mut *tx)
                        .await?;
                if removed.rows_affected() == 1 {
                    sqlx::query("UPDATE posts SET vote_count = vote_count - 1 WHERE id = ?")
                        .bind(uuid_to_blob(post_id))
                        .execute(&mut *tx)
                        .await?;
                }
                None
            }
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn set_comment_vote(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        action: VoteAction,
    ) -> anyhow::Result<Option<Vote>> {
        let mut tx = self.pool.begin().await?;
        let result = match action {
            VoteAction::Like => {
                let now = Utc::now();
                let inserted = sqlx::query(
                    "INSERT OR IGNORE INTO comment_votes (user_id, comment_id, created_at) \
                     VALUES (?, ?, ?)",
                )
                .bind(uuid_to_blob(user_id))
                .bind(uuid_to_blob(comment_id))
                .bind(now)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 1 {
                    sqlx::query("UPDATE comments SET vote_count = vote_count + 1 WHERE id = ?")
                        .bind(uuid_to_blob(comment_id))
                        .execute(&mut *tx)
                        .await?;
                }
                let row = sqlx::query(
                    "SELECT created_at FROM comment_votes WHERE user_id = ? AND comment_id = ?",
                )
                .bind(uuid_to_blob(user_id))
                .bind(uuid_to_blob(comment_id))
                .fetch_one(&mut *tx)
                .await?;
                Some(Vote { user_id, target_id: comment_id, created_at: row.get("created_at") })
            }
            VoteAction::Unlike => {
                let removed =
                    sqlx::query("DELETE FROM comment_votes WHERE user_id = ? AND comment_id = ?")
                        .bind(uuid_to_blob(user_id))
                        .bind(uuid_to_blob(comment_id))
                        .execute(&mut *tx)
                        .await?;
                if removed.rows_affected() == 1 {
                    sqlx::query("UPDATE comments SET vote_count = vote_count - 1 WHERE id = ?")
                        .bind(uuid_to_blob(comment_id))
                        .execute(&mut *tx)
                        .await?;
                }
                None
            }
        };
        tx.commit().await?;
        Ok(result)
    }

    // ── Search ───────────────────────────────────────────────────────────

    async fn search(&self, query: &str) -> anyhow::Result<SearchResults> {
        let trimmed = query.trim();
        let mut results = SearchResults::default();

        let (users_q, communities_q, posts_q) =
            if let Some(rest) = trimmed.strip_prefix("u/") {
                (Some(rest), None, None)
            } else if let Some(rest) = trimmed.strip_prefix("b/") {
                (None, Some(rest), None)
            } else {
                (Some(trimmed), Some(trimmed), Some(trimmed))
            };

        if let Some(q) = users_q {
            let rows =
                sqlx::query("SELECT * FROM users WHERE name LIKE '%' || ? || '%' LIMIT ?")
                    .bind(q)
                    .bind(SEARCH_LIMIT)
                    .fetch_all(&self.pool)
                    .await?;
            results.users = rows.iter().map(map_user).collect();
        }
        if let Some(q) = communities_q {
            results.communities = self.find_communities(q, SEARCH_LIMIT).await?;
        }
        if let Some(q) = posts_q {
            let sql = format!(
                "{POST_SELECT} WHERE p.is_deleted = 0 AND p.title LIKE '%' || ? || '%' \
                 ORDER BY p.id DESC LIMIT ?"
            );
            let rows = sqlx::query(&sql)
                .bind(None::<Vec<u8>>)
                .bind(q)
                .bind(SEARCH_LIMIT)
                .fetch_all(&self.pool)
                .await?;
            results.posts = rows.iter().map(map_post).collect();
        }
        Ok(results)
    }

    // ── Notifications ────────────────────────────────────────────────────

    async fn push_notification(&self, notification: Notification) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, actor_id, kind, post_id, comment_id, \
             is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(notification.id))
        .bind(uuid_to_blob(notification.user_id))
        .bind(uuid_to_blob(notification.actor_id))
        .bind(notification.kind.as_str())
        .bind(uuid_to_blob(notification.post_id))
        .bind(opt_uuid_to_blob(notification.comment_id))
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        count: i64,
        cursor: Option<Uuid>,
    ) -> anyhow::Result<Page<Notification>> {
        let mut sql = String::from("SELECT * FROM notifications WHERE user_id = ?");
        if cursor.is_some() {
            sql.push_str(" AND id < ?");
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");

        let mut query = sqlx::query(&sql).bind(uuid_to_blob(user_id));
        if let Some(cursor) = cursor {
            query = query.bind(uuid_to_blob(cursor));
        }
        query = query.bind(count);

        let rows = query.fetch_all(&self.pool).await?;
        let notifications: Vec<Notification> = rows.iter().map(map_notification).collect();
        Ok(Page::from_batch(notifications, count as usize, |n| n.id))
    }
}

#[cfg(test)]
mod tests;
