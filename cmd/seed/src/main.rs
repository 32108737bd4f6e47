//! Populates a local database with demo users, a community, posts and a
//! comment thread. Safe to run against an empty database only; reruns will
//! fail on the unique user/community names.

use std::time::Duration;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use cm_core::{Comment, Community, ForumRepo, Post, RuleList, User, VoteAction};
use cm_db_sqlite::SqliteForumRepo;

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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    dotenvy::dotenv().ok();

    // Only the database URL matters here; the server settings schema would
    // also demand a session secret.
    let database_url = std::env::var("COMMUNE_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:commune.db?mode=rwc".to_string());
    let repo = SqliteForumRepo::new(&database_url).await?;

    let alice = user("alice");
    let bob = user("bob");
    repo.create_user(alice.clone()).await?;
    repo.create_user(bob.clone()).await?;

    let mut rules = RuleList::new();
    rules.add_rule("be nice", "No flaming, no dogpiling.");
    rules.add_rule("cats only", "Dog content belongs in b/dogs.");
    let cats = Community {
        id: Uuid::now_v7(),
        name: "cats".to_string(),
        description: Some("Pictures and discussion of cats.".to_string()),
        image_url: None,
        logo_url: None,
        rules: rules.clone(),
        owner_id: alice.id,
        moderators: vec![],
        created_at: Utc::now(),
    };
    repo.create_community(cats.clone()).await?;
    repo.update_community_rules(cats.id, rules).await?;
    repo.add_moderator(cats.id, bob.id).await?;

    let mut first_post = None;
    for (author, title) in [
        (&alice, "My cat learned to open doors"),
        (&bob, "Best litter for long-haired breeds?"),
        (&alice, "Saturday caturday thread"),
    ] {
        let post = Post {
            id: Uuid::now_v7(),
            title: title.to_string(),
            content: String::new(),
            community_id: cats.id,
            community_name: cats.name.clone(),
            author_id: author.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_deleted: false,
            vote_count: 0,
            comment_count: 0,
            votes: vec![],
        };
        repo.create_post(post.clone()).await?;
        first_post.get_or_insert(post);
        // Keep UUID v7 ids strictly ordered across posts.
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    let discussed = first_post.expect("posts were seeded");
    let top = Comment {
        id: Uuid::now_v7(),
        content: "Mine does this too, no door is safe.".to_string(),
        post_id: discussed.id,
        parent_id: None,
        author_id: bob.id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        is_deleted: false,
        vote_count: 0,
        reply_count: 0,
        votes: vec![],
    };
    repo.create_comment(top.clone()).await?;
    repo.create_comment(Comment {
        id: Uuid::now_v7(),
        content: "Time to invest in round doorknobs.".to_string(),
        parent_id: Some(top.id),
        ..top.clone()
    })
    .await?;

    repo.set_post_vote(discussed.id, bob.id, VoteAction::Like).await?;

    info!(
        community = %cats.name,
        "seeded demo data; users alice and bob, 3 posts, 2 comments"
    );
    Ok(())
}
