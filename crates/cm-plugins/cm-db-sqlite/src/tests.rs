use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use cm_core::{
    BanDuration, Comment, Community, ForumRepo, Notification, NotificationKind, Post, PostFilter,
    PostSort, RuleList, TimeWindow, User, VoteAction,
};

use super::SqliteForumRepo;

async fn repo() -> SqliteForumRepo {
    SqliteForumRepo::new("sqlite::memory:").await.unwrap()
}

fn user(name: &str) -> User {
    User {
        id: Uuid::now_v7(),
        name: name.to_string(),
        image: None,
        banned_until: None,
        is_global_moderator: false,
        created_at: Utc::now(),
    }
}

fn community(name: &str, owner: Uuid) -> Community {
    Community {
        id: Uuid::now_v7(),
        name: name.to_string(),
        description: None,
        image_url: None,
        logo_url: None,
        rules: RuleList::new(),
        owner_id: owner,
        moderators: vec![],
        created_at: Utc::now(),
    }
}

fn post(community: &Community, author: Uuid, title: &str) -> Post {
    Post {
        id: Uuid::now_v7(),
        title: title.to_string(),
        content: String::new(),
        community_id: community.id,
        community_name: community.name.clone(),
        author_id: author,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        is_deleted: false,
        vote_count: 0,
        comment_count: 0,
        votes: vec![],
    }
}

fn comment(post_id: Uuid, parent_id: Option<Uuid>, author: Uuid) -> Comment {
    Comment {
        id: Uuid::now_v7(),
        content: "a comment".to_string(),
        post_id,
        parent_id,
        author_id: author,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        is_deleted: false,
        vote_count: 0,
        reply_count: 0,
        votes: vec![],
    }
}

/// UUID v7 ids within the same millisecond are not ordered; space creations
/// out so listing order is deterministic.
async fn tick() {
    tokio::time::sleep(Duration::from_millis(3)).await;
}

async fn seed(repo: &SqliteForumRepo, community_name: &str) -> (User, Community) {
    let owner = user(&format!("{community_name}_owner"));
    repo.create_user(owner.clone()).await.unwrap();
    let c = community(community_name, owner.id);
    repo.create_community(c.clone()).await.unwrap();
    (owner, c)
}

#[tokio::test]
async fn test_cursor_pagination_scenario() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;

    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        let p = post(&cats, owner.id, title);
        ids.push(p.id);
        repo.create_post(p).await.unwrap();
        tick().await;
    }

    let filter = PostFilter {
        community: Some("cats".to_string()),
        sort: PostSort::New,
        window: TimeWindow::AllTime,
        count: 2,
        cursor: None,
    };
    let page1 = repo.list_posts(&filter, None).await.unwrap();
    assert_eq!(page1.items.len(), 2);
    assert_eq!(page1.items[0].id, ids[2]); // newest first
    assert_eq!(page1.items[1].id, ids[1]);
    assert_eq!(page1.next_cursor, Some(ids[1]));

    let page2 = repo
        .list_posts(&PostFilter { cursor: page1.next_cursor, ..filter.clone() }, None)
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.items[0].id, ids[0]);
    assert_eq!(page2.next_cursor, None);

    // Concatenated pages: no duplicates, strictly decreasing ids.
    let mut seen: Vec<Uuid> = page1.items.iter().chain(&page2.items).map(|p| p.id).collect();
    assert!(seen.windows(2).all(|w| w[0] > w[1]));
    seen.dedup();
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn test_hot_sort_with_time_window() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;

    let mut old_favorite = post(&cats, owner.id, "old favorite");
    old_favorite.created_at = Utc::now() - chrono::Duration::days(2);
    let fresh_hit = post(&cats, owner.id, "fresh hit");
    let fresh_other = post(&cats, owner.id, "fresh other");
    repo.create_post(old_favorite.clone()).await.unwrap();
    tick().await;
    repo.create_post(fresh_hit.clone()).await.unwrap();
    tick().await;
    repo.create_post(fresh_other.clone()).await.unwrap();

    for _ in 0..3 {
        let voter = user(&format!("voter{}", Uuid::new_v4()));
        repo.create_user(voter.clone()).await.unwrap();
        repo.set_post_vote(old_favorite.id, voter.id, VoteAction::Like).await.unwrap();
    }
    for _ in 0..2 {
        let voter = user(&format!("voter{}", Uuid::new_v4()));
        repo.create_user(voter.clone()).await.unwrap();
        repo.set_post_vote(fresh_hit.id, voter.id, VoteAction::Like).await.unwrap();
    }

    let day = PostFilter {
        community: None,
        sort: PostSort::Hot,
        window: TimeWindow::Day,
        count: 10,
        cursor: None,
    };
    let page = repo.list_posts(&day, None).await.unwrap();
    let titles: Vec<&str> = page.items.iter().map(|p| p.title.as_str()).collect();
    // The two-day-old post is outside the window despite its votes.
    assert_eq!(titles, vec!["fresh hit", "fresh other"]);

    let all_time = PostFilter { window: TimeWindow::AllTime, count: 2, ..day };
    let page1 = repo.list_posts(&all_time, None).await.unwrap();
    assert_eq!(page1.items[0].id, old_favorite.id);
    assert_eq!(page1.items[1].id, fresh_hit.id);
    assert_eq!(page1.next_cursor, Some(fresh_hit.id));

    // Keyset continuation picks up below the cursor's (votes, id) rank.
    let page2 = repo
        .list_posts(&PostFilter { cursor: page1.next_cursor, ..all_time }, None)
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.items[0].id, fresh_other.id);
}

#[tokio::test]
async fn test_vote_toggle_is_idempotent() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "votable");
    repo.create_post(p.clone()).await.unwrap();
    let voter = user("alice");
    repo.create_user(voter.clone()).await.unwrap();

    let vote = repo.set_post_vote(p.id, voter.id, VoteAction::Like).await.unwrap();
    assert_eq!(vote.unwrap().user_id, voter.id);
    // Liking an already-liked post changes nothing.
    repo.set_post_vote(p.id, voter.id, VoteAction::Like).await.unwrap();
    let fetched = repo.get_post(p.id, Some(voter.id)).await.unwrap().unwrap();
    assert_eq!(fetched.vote_count, 1);
    assert_eq!(fetched.votes.len(), 1);

    // The projection is per-viewer.
    let stranger = repo.get_post(p.id, Some(Uuid::now_v7())).await.unwrap().unwrap();
    assert_eq!(stranger.vote_count, 1);
    assert!(stranger.votes.is_empty());

    assert!(repo.set_post_vote(p.id, voter.id, VoteAction::Unlike).await.unwrap().is_none());
    repo.set_post_vote(p.id, voter.id, VoteAction::Unlike).await.unwrap();
    let fetched = repo.get_post(p.id, Some(voter.id)).await.unwrap().unwrap();
    assert_eq!(fetched.vote_count, 0);
    assert!(fetched.votes.is_empty());
}

#[tokio::test]
async fn test_comment_tree_materializes_four_levels() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "discussion");
    repo.create_post(p.clone()).await.unwrap();

    // A chain five levels deep.
    let mut chain = Vec::new();
    let mut parent = None;
    for _ in 0..5 {
        let c = comment(p.id, parent, owner.id);
        parent = Some(c.id);
        chain.push(c.clone());
        repo.create_comment(c).await.unwrap();
        tick().await;
    }

    let page = repo.list_comments(p.id, None, 10, None, None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    let root = &page.items[0];
    assert_eq!(root.comment.id, chain[0].id);
    let depth2 = &root.replies[0];
    let depth3 = &depth2.replies[0];
    let depth4 = &depth3.replies[0];
    assert_eq!(depth4.comment.id, chain[3].id);
    // The fifth level is not materialized eagerly...
    assert!(depth4.replies.is_empty());
    assert_eq!(depth4.comment.reply_count, 1);

    // ...it is fetched lazily with the depth-4 comment as the root.
    let deeper = repo.list_comments(p.id, Some(chain[3].id), 10, None, None).await.unwrap();
    assert_eq!(deeper.items.len(), 1);
    assert_eq!(deeper.items[0].comment.id, chain[4].id);
}

#[tokio::test]
async fn test_sibling_comments_are_newest_first() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "discussion");
    repo.create_post(p.clone()).await.unwrap();

    let root = comment(p.id, None, owner.id);
    repo.create_comment(root.clone()).await.unwrap();
    tick().await;
    let older = comment(p.id, Some(root.id), owner.id);
    repo.create_comment(older.clone()).await.unwrap();
    tick().await;
    let newer = comment(p.id, Some(root.id), owner.id);
    repo.create_comment(newer.clone()).await.unwrap();

    let page = repo.list_comments(p.id, None, 10, None, None).await.unwrap();
    let replies = &page.items[0].replies;
    assert_eq!(replies[0].comment.id, newer.id);
    assert_eq!(replies[1].comment.id, older.id);

    let fetched = repo.get_post(p.id, None).await.unwrap().unwrap();
    assert_eq!(fetched.comment_count, 3);
    assert_eq!(page.items[0].comment.reply_count, 2);
}

#[tokio::test]
async fn test_nuke_comment_removes_the_subtree() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "discussion");
    repo.create_post(p.clone()).await.unwrap();

    let root = comment(p.id, None, owner.id);
    repo.create_comment(root.clone()).await.unwrap();
    let branch = comment(p.id, Some(root.id), owner.id);
    repo.create_comment(branch.clone()).await.unwrap();
    let leaf = comment(p.id, Some(branch.id), owner.id);
    repo.create_comment(leaf.clone()).await.unwrap();
    let bystander = comment(p.id, None, owner.id);
    repo.create_comment(bystander.clone()).await.unwrap();
    repo.set_comment_vote(leaf.id, owner.id, VoteAction::Like).await.unwrap();

    repo.nuke_comment(branch.id).await.unwrap();

    assert!(repo.get_comment(branch.id, None).await.unwrap().is_none());
    assert!(repo.get_comment(leaf.id, None).await.unwrap().is_none());
    assert!(repo.get_comment(bystander.id, None).await.unwrap().is_some());

    let fetched = repo.get_post(p.id, None).await.unwrap().unwrap();
    assert_eq!(fetched.comment_count, 2);
    let root = repo.get_comment(root.id, None).await.unwrap().unwrap();
    assert_eq!(root.reply_count, 0);
}

#[tokio::test]
async fn test_nuke_post_cascades() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "doomed");
    repo.create_post(p.clone()).await.unwrap();
    let c = comment(p.id, None, owner.id);
    repo.create_comment(c.clone()).await.unwrap();
    repo.set_post_vote(p.id, owner.id, VoteAction::Like).await.unwrap();
    repo.set_comment_vote(c.id, owner.id, VoteAction::Like).await.unwrap();

    repo.nuke_post(p.id).await.unwrap();

    assert!(repo.get_post(p.id, None).await.unwrap().is_none());
    assert!(repo.get_comment(c.id, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_soft_deleted_posts_hide_from_listings_only() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "going away");
    repo.create_post(p.clone()).await.unwrap();

    repo.set_post_deleted(p.id, true).await.unwrap();

    let filter = PostFilter {
        community: Some("cats".to_string()),
        sort: PostSort::New,
        window: TimeWindow::AllTime,
        count: 10,
        cursor: None,
    };
    assert!(repo.list_posts(&filter, None).await.unwrap().items.is_empty());
    let fetched = repo.get_post(p.id, None).await.unwrap().unwrap();
    assert!(fetched.is_deleted);

    repo.set_post_deleted(p.id, false).await.unwrap();
    assert_eq!(repo.list_posts(&filter, None).await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn test_search_prefix_disambiguation() {
    let repo = repo().await;
    let (_, _) = seed(&repo, "catalonia").await;
    let alice = user("catherine");
    repo.create_user(alice.clone()).await.unwrap();
    let (owner, cats) = seed(&repo, "cats").await;
    repo.create_post(post(&cats, owner.id, "cat pictures")).await.unwrap();

    let everything = repo.search("cat").await.unwrap();
    assert!(!everything.users.is_empty());
    assert_eq!(everything.communities.len(), 2);
    assert_eq!(everything.posts.len(), 1);

    let users_only = repo.search("u/cath").await.unwrap();
    assert_eq!(users_only.users.len(), 1);
    assert!(users_only.communities.is_empty());
    assert!(users_only.posts.is_empty());

    let communities_only = repo.search("b/cat").await.unwrap();
    assert!(communities_only.users.is_empty());
    assert_eq!(communities_only.communities.len(), 2);
}

#[tokio::test]
async fn test_ban_sets_a_time_window() {
    let repo = repo().await;
    let banned = user("troublemaker");
    repo.create_user(banned.clone()).await.unwrap();

    let now = Utc::now();
    repo.ban_user(banned.id, BanDuration::Hour.until(now)).await.unwrap();

    let fetched = repo.get_user(banned.id).await.unwrap().unwrap();
    let until = fetched.banned_until.expect("ban recorded");
    assert!((until - (now + chrono::Duration::hours(1))).num_seconds().abs() <= 1);
}

#[tokio::test]
async fn test_moderator_roster_and_ownership() {
    let repo = repo().await;
    let (owner, cats) = seed(&repo, "cats").await;
    let moderator = user("mod");
    repo.create_user(moderator.clone()).await.unwrap();

    repo.add_moderator(cats.id, moderator.id).await.unwrap();
    let fetched = repo.get_community("cats").await.unwrap().unwrap();
    assert_eq!(fetched.moderators, vec![moderator.id]);
    assert_eq!(fetched.owner_id, owner.id);

    repo.transfer_owner(cats.id, moderator.id).await.unwrap();
    repo.remove_moderator(cats.id, moderator.id).await.unwrap();
    let fetched = repo.get_community("cats").await.unwrap().unwrap();
    assert_eq!(fetched.owner_id, moderator.id);
    assert!(fetched.moderators.is_empty());
}

#[tokio::test]
async fn test_rules_round_trip_as_pairs() {
    let repo = repo().await;
    let (_, cats) = seed(&repo, "cats").await;

    let mut rules = RuleList::new();
    rules.add_rule("be nice", "no flaming");
    rules.add_rule("stay on topic", "cats only");
    repo.update_community_rules(cats.id, rules).await.unwrap();

    let fetched = repo.get_community("cats").await.unwrap().unwrap();
    assert_eq!(fetched.rules.len_pairs(), 2);
    let pairs: Vec<_> = fetched.rules.pairs().collect();
    assert_eq!(pairs[0], ("be nice", "no flaming"));
}

#[tokio::test]
async fn test_notifications_paginate_like_posts() {
    let repo = repo().await;
    let recipient = user("recipient");
    repo.create_user(recipient.clone()).await.unwrap();
    let (owner, cats) = seed(&repo, "cats").await;
    let p = post(&cats, owner.id, "discussed");
    repo.create_post(p.clone()).await.unwrap();

    for _ in 0..3 {
        repo.push_notification(Notification {
            id: Uuid::now_v7(),
            user_id: recipient.id,
            actor_id: owner.id,
            kind: NotificationKind::PostReply,
            post_id: p.id,
            comment_id: None,
            is_read: false,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        tick().await;
    }

    let page1 = repo.list_notifications(recipient.id, 2, None).await.unwrap();
    assert_eq!(page1.items.len(), 2);
    let cursor = page1.next_cursor.expect("full page carries a cursor");
    let page2 = repo.list_notifications(recipient.id, 2, Some(cursor)).await.unwrap();
    assert_eq!(page2.items.len(), 1);
    assert_eq!(page2.next_cursor, None);
}
