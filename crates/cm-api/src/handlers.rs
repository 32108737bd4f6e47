//! # cm-api Handlers
//!
//! One handler per backend procedure. The flow is the same everywhere:
//! validate the input, check the caller's standing, then hand off to the
//! repository port and return the result as JSON.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cm_core::validate;
use cm_core::{
    AppError, BanDuration, Comment, CommentNode, Community, Notification, NotificationKind, Page,
    Post, PostFilter, PostSort, RuleList, SearchResults, TimeWindow, Vote, VoteAction,
};

use crate::error::ApiResult;
use crate::extract::{RequireViewer, Viewer};
use crate::AppState;

fn default_window() -> TimeWindow {
    TimeWindow::AllTime
}

async fn community_or_404(state: &AppState, name: &str) -> ApiResult<Community> {
    state
        .repo
        .get_community(name)
        .await?
        .ok_or_else(|| AppError::not_found("Community", name).into())
}

async fn post_or_404(state: &AppState, id: Uuid) -> ApiResult<Post> {
    state
        .repo
        .get_post(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("Post", id).into())
}

async fn comment_or_404(state: &AppState, id: Uuid) -> ApiResult<Comment> {
    state
        .repo
        .get_comment(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("Comment", id).into())
}

async fn user_or_404(state: &AppState, id: Uuid) -> ApiResult<cm_core::User> {
    state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id).into())
}

// ── Posts ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetPostsParams {
    pub community: Option<String>,
    pub sort: PostSort,
    #[serde(default = "default_window")]
    pub posts_from_last: TimeWindow,
    pub count: i64,
    pub cursor: Option<Uuid>,
}

pub async fn get_posts(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<GetPostsParams>,
) -> ApiResult<Json<Page<Post>>> {
    validate::page_count(params.count)?;
    let filter = PostFilter {
        community: params.community,
        sort: params.sort,
        window: params.posts_from_last,
        count: params.count,
        cursor: params.cursor,
    };
    let page = state.repo.list_posts(&filter, viewer.map(|c| c.user_id)).await?;
    Ok(Json(page))
}

pub async fn get_post(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Option<Post>>> {
    let post = state.repo.get_post(id, viewer.map(|c| c.user_id)).await?;
    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostInput {
    pub community: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

pub async fn create_post(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Json(input): Json<CreatePostInput>,
) -> ApiResult<Json<Post>> {
    validate::post_title(&input.title)?;
    validate::post_content(&input.content)?;
    let now = Utc::now();
    ctx.ensure_not_banned(now)?;
    let community = community_or_404(&state, &input.community).await?;

    let post = Post {
        id: Uuid::now_v7(),
        title: input.title,
        content: input.content,
        community_id: community.id,
        community_name: community.name,
        author_id: ctx.user_id,
        created_at: now,
        updated_at: now,
        is_deleted: false,
        vote_count: 0,
        comment_count: 0,
        votes: vec![],
    };
    state.repo.create_post(post.clone()).await?;
    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
pub struct EditPostInput {
    pub title: String,
    pub content: String,
}

pub async fn edit_post(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
    Json(input): Json<EditPostInput>,
) -> ApiResult<Json<Post>> {
    validate::post_title(&input.title)?;
    validate::post_content(&input.content)?;
    ctx.ensure_not_banned(Utc::now())?;
    let post = post_or_404(&state, id).await?;
    if post.author_id != ctx.user_id {
        return Err(AppError::Unauthorized("only the author may edit a post".to_string()).into());
    }
    state.repo.update_post(id, input.title, input.content).await?;
    let updated = post_or_404(&state, id).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct VoteInput {
    pub action: VoteAction,
}

pub async fn like_post(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
    Json(input): Json<VoteInput>,
) -> ApiResult<Json<Option<Vote>>> {
    ctx.ensure_not_banned(Utc::now())?;
    let post = post_or_404(&state, id).await?;
    let vote = state.repo.set_post_vote(post.id, ctx.user_id, input.action).await?;
    Ok(Json(vote))
}

#[derive(Debug, Deserialize)]
pub struct SetDeletedInput {
    pub deleted: bool,
}

pub async fn set_post_deleted(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
    Json(input): Json<SetDeletedInput>,
) -> ApiResult<Json<Post>> {
    ctx.ensure_not_banned(Utc::now())?;
    let post = post_or_404(&state, id).await?;
    // Authors may remove their own content; anything else is moderation.
    if post.author_id != ctx.user_id {
        let community = community_or_404(&state, &post.community_name).await?;
        ctx.ensure_can_moderate(&community)?;
    }
    state.repo.set_post_deleted(id, input.deleted).await?;
    let updated = post_or_404(&state, id).await?;
    Ok(Json(updated))
}

pub async fn nuke_post(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<()>> {
    ctx.ensure_not_banned(Utc::now())?;
    let post = post_or_404(&state, id).await?;
    let community = community_or_404(&state, &post.community_name).await?;
    ctx.ensure_can_moderate(&community)?;
    state.repo.nuke_post(id).await?;
    Ok(Json(()))
}

// ── Comments ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetCommentsParams {
    pub main_comment_id: Option<Uuid>,
    pub count: i64,
    pub cursor: Option<Uuid>,
}

pub async fn get_comments(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(post_id): Path<Uuid>,
    Query(params): Query<GetCommentsParams>,
) -> ApiResult<Json<Page<CommentNode>>> {
    validate::page_count(params.count)?;
    let page = state
        .repo
        .list_comments(
            post_id,
            params.main_comment_id,
            params.count,
            params.cursor,
            viewer.map(|c| c.user_id),
        )
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Json(input): Json<CreateCommentInput>,
) -> ApiResult<Json<Comment>> {
    validate::comment_content(&input.content)?;
    let now = Utc::now();
    ctx.ensure_not_banned(now)?;
    let post = post_or_404(&state, input.post_id).await?;
    let parent = match input.parent_id {
        Some(parent_id) => {
            let parent = comment_or_404(&state, parent_id).await?;
            if parent.post_id != post.id {
                return Err(AppError::ValidationError(
                    "parent comment belongs to a different post".to_string(),
                )
                .into());
            }
            Some(parent)
        }
        None => None,
    };

    let comment = Comment {
        id: Uuid::now_v7(),
        content: input.content,
        post_id: post.id,
        parent_id: input.parent_id,
        author_id: ctx.user_id,
        created_at: now,
        updated_at: now,
        is_deleted: false,
        vote_count: 0,
        reply_count: 0,
        votes: vec![],
    };
    state.repo.create_comment(comment.clone()).await?;

    // Reply activity lands in the parent author's (or the post author's)
    // notification feed, unless they are replying to themselves.
    let (recipient, kind) = match &parent {
        Some(parent) => (parent.author_id, NotificationKind::CommentReply),
        None => (post.author_id, NotificationKind::PostReply),
    };
    if recipient != ctx.user_id {
        state
            .repo
            .push_notification(Notification {
                id: Uuid::now_v7(),
                user_id: recipient,
                actor_id: ctx.user_id,
                kind,
                post_id: post.id,
                comment_id: Some(comment.id),
                is_read: false,
                created_at: now,
            })
            .await?;
    }
    Ok(Json(comment))
}

#[derive(Debug, Deserialize)]
pub struct EditCommentInput {
    pub content: String,
}

pub async fn edit_comment(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
    Json(input): Json<EditCommentInput>,
) -> ApiResult<Json<Comment>> {
    validate::comment_content(&input.content)?;
    ctx.ensure_not_banned(Utc::now())?;
    let comment = comment_or_404(&state, id).await?;
    if comment.author_id != ctx.user_id {
        return Err(
            AppError::Unauthorized("only the author may edit a comment".to_string()).into()
        );
    }
    state.repo.update_comment(id, input.content).await?;
    let updated = comment_or_404(&state, id).await?;
    Ok(Json(updated))
}

pub async fn like_comment(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
    Json(input): Json<VoteInput>,
) -> ApiResult<Json<Option<Vote>>> {
    ctx.ensure_not_banned(Utc::now())?;
    let comment = comment_or_404(&state, id).await?;
    let vote = state.repo.set_comment_vote(comment.id, ctx.user_id, input.action).await?;
    Ok(Json(vote))
}

pub async fn set_comment_deleted(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
    Json(input): Json<SetDeletedInput>,
) -> ApiResult<Json<Comment>> {
    ctx.ensure_not_banned(Utc::now())?;
    let comment = comment_or_404(&state, id).await?;
    if comment.author_id != ctx.user_id {
        let post = post_or_404(&state, comment.post_id).await?;
        let community = community_or_404(&state, &post.community_name).await?;
        ctx.ensure_can_moderate(&community)?;
    }
    state.repo.set_comment_deleted(id, input.deleted).await?;
    let updated = comment_or_404(&state, id).await?;
    Ok(Json(updated))
}

pub async fn nuke_comment(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<()>> {
    ctx.ensure_not_banned(Utc::now())?;
    let comment = comment_or_404(&state, id).await?;
    let post = post_or_404(&state, comment.post_id).await?;
    let community = community_or_404(&state, &post.community_name).await?;
    ctx.ensure_can_moderate(&community)?;
    state.repo.nuke_comment(id).await?;
    Ok(Json(()))
}

// ── Communities ──────────────────────────────────────────────────────────

pub async fn get_community(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Community>> {
    let community = community_or_404(&state, &name).await?;
    Ok(Json(community))
}

#[derive(Debug, Deserialize)]
pub struct FindCommunityParams {
    pub name: String,
}

pub async fn find_community(
    State(state): State<AppState>,
    Query(params): Query<FindCommunityParams>,
) -> ApiResult<Json<Vec<Community>>> {
    let matches = state
        .repo
        .find_communities(&params.name, validate::COMMUNITY_FIND_LIMIT)
        .await?;
    Ok(Json(matches))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommunityInput {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_community(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Json(input): Json<CreateCommunityInput>,
) -> ApiResult<Json<Community>> {
    validate::community_name(&input.name)?;
    let now = Utc::now();
    ctx.ensure_not_banned(now)?;
    if state.repo.get_community(&input.name).await?.is_some() {
        return Err(
            AppError::Conflict(format!("community {} already exists", input.name)).into()
        );
    }

    let community = Community {
        id: Uuid::now_v7(),
        name: input.name,
        description: input.description,
        image_url: None,
        logo_url: None,
        rules: RuleList::new(),
        owner_id: ctx.user_id,
        moderators: vec![],
        created_at: now,
    };
    state.repo.create_community(community.clone()).await?;
    Ok(Json(community))
}

#[derive(Debug, Deserialize)]
pub struct EditCommunityInput {
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub logo_url: Option<String>,
}

/// The name is immutable; only the presentational fields can change.
pub async fn edit_community(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(name): Path<String>,
    Json(input): Json<EditCommunityInput>,
) -> ApiResult<Json<Community>> {
    ctx.ensure_not_banned(Utc::now())?;
    let community = community_or_404(&state, &name).await?;
    ctx.ensure_can_moderate(&community)?;
    state
        .repo
        .update_community_profile(community.id, input.description, input.image_url, input.logo_url)
        .await?;
    let updated = community_or_404(&state, &name).await?;
    Ok(Json(updated))
}

pub async fn edit_community_rules(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(name): Path<String>,
    Json(rules): Json<Vec<String>>,
) -> ApiResult<Json<Community>> {
    // Rejects odd-length sequences: rules are always (title, content) pairs.
    let rules = RuleList::from_flat(rules)?;
    ctx.ensure_not_banned(Utc::now())?;
    let community = community_or_404(&state, &name).await?;
    ctx.ensure_can_moderate(&community)?;
    state.repo.update_community_rules(community.id, rules).await?;
    let updated = community_or_404(&state, &name).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ModeratorInput {
    pub user_id: Uuid,
}

pub async fn add_moderator(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(name): Path<String>,
    Json(input): Json<ModeratorInput>,
) -> ApiResult<Json<Community>> {
    ctx.ensure_not_banned(Utc::now())?;
    let community = community_or_404(&state, &name).await?;
    ctx.ensure_can_moderate(&community)?;
    user_or_404(&state, input.user_id).await?;
    state.repo.add_moderator(community.id, input.user_id).await?;
    let updated = community_or_404(&state, &name).await?;
    Ok(Json(updated))
}

pub async fn remove_moderator(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path((name, user_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Community>> {
    ctx.ensure_not_banned(Utc::now())?;
    let community = community_or_404(&state, &name).await?;
    ctx.ensure_can_moderate(&community)?;
    state.repo.remove_moderator(community.id, user_id).await?;
    let updated = community_or_404(&state, &name).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub new_owner: Uuid,
}

pub async fn transfer_community(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(name): Path<String>,
    Json(input): Json<TransferInput>,
) -> ApiResult<Json<Community>> {
    ctx.ensure_not_banned(Utc::now())?;
    let community = community_or_404(&state, &name).await?;
    ctx.ensure_can_moderate(&community)?;
    user_or_404(&state, input.new_owner).await?;
    state.repo.transfer_owner(community.id, input.new_owner).await?;
    let updated = community_or_404(&state, &name).await?;
    Ok(Json(updated))
}

// ── Moderation ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BanInput {
    /// The community whose moderator-class is exercising the ban; the
    /// resulting window applies to the user globally.
    pub community: String,
    pub duration: BanDuration,
}

#[derive(Debug, Serialize)]
pub struct BanResponse {
    pub user_id: Uuid,
    pub banned_until: chrono::DateTime<Utc>,
}

pub async fn ban_user(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Path(user_id): Path<Uuid>,
    Json(input): Json<BanInput>,
) -> ApiResult<Json<BanResponse>> {
    let now = Utc::now();
    ctx.ensure_not_banned(now)?;
    let community = community_or_404(&state, &input.community).await?;
    ctx.ensure_can_moderate(&community)?;
    user_or_404(&state, user_id).await?;

    let until = input.duration.until(now);
    state.repo.ban_user(user_id, until).await?;
    Ok(Json(BanResponse { user_id, banned_until: until }))
}

// ── Search / notifications ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResults>> {
    let results = state.repo.search(&params.q).await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct GetNotificationsParams {
    pub count: i64,
    pub cursor: Option<Uuid>,
}

pub async fn get_notifications(
    State(state): State<AppState>,
    RequireViewer(ctx): RequireViewer,
    Query(params): Query<GetNotificationsParams>,
) -> ApiResult<Json<Page<Notification>>> {
    validate::page_count(params.count)?;
    let page = state
        .repo
        .list_notifications(ctx.user_id, params.count, params.cursor)
        .await?;
    Ok(Json(page))
}
