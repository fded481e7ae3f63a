use serde::Serialize;
use serde_json::Value;

use domain::Comment;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const SLUG: &str = "hello-world";

#[derive(Serialize)]
struct CreateCommentRequest<'a> {
    name: &'a str,
    text: &'a str,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct CreateCommentResponse {
    comment: Comment,
}

#[derive(serde::Deserialize)]
struct CommentsResponse {
    comments: Vec<Comment>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = std::env::var("BLOG_CLIENT_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = reqwest::Client::new();
    println!("Starting post interactions test client against {}...", base_url);

    println!("\n[1/5] Health check...");
    let health: Value = client.get(format!("{}/health", base_url)).send().await?.json().await?;
    println!("   -> {}", health);

    println!("\n[2/5] Viewing {} twice...", SLUG);
    let views_url = format!("{}/views/{}", base_url, SLUG);
    for _ in 0..2 {
        let resp: Value = client.get(&views_url).send().await?.json().await?;
        println!("   -> views = {}", resp["views"]);
    }

    println!("\n[3/5] Liking...");
    let resp: Value = client
        .post(format!("{}/likes/{}", base_url, SLUG))
        .send()
        .await?
        .json()
        .await?;
    println!("   -> likes = {}", resp["likes"]);

    println!("\n[4/5] Posting a comment and a reply...");
    let comments_url = format!("{}/comments/{}", base_url, SLUG);
    let resp = client
        .post(&comments_url)
        .json(&CreateCommentRequest {
            name: "Ferris",
            text: "This is a message from the test client!",
            parent_id: None,
        })
        .send()
        .await?;
    if !resp.status().is_success() {
        println!("   -> ❌ Failed to send: {:?}", resp.text().await?);
        return Ok(());
    }
    let root: CreateCommentResponse = resp.json().await?;
    println!("   -> ✅ Comment {}", root.comment.id);

    let reply: CreateCommentResponse = client
        .post(&comments_url)
        .json(&CreateCommentRequest {
            name: "Corro",
            text: "Replying to Ferris",
            parent_id: Some(root.comment.id.as_str()),
        })
        .send()
        .await?
        .json()
        .await?;
    println!("   -> ✅ Reply {}", reply.comment.id);

    println!("\n[5/5] Fetching comment tree...");
    let listed: CommentsResponse = client.get(&comments_url).send().await?.json().await?;
    println!("   -> Retrieved {} top-level comment(s):", listed.comments.len());
    for c in &listed.comments {
        print_thread(c, 1);
    }

    Ok(())
}

fn print_thread(c: &Comment, depth: usize) {
    println!("{}- [{}] {}: {}", "   ".repeat(depth + 1), c.date, c.name, c.text);
    for reply in &c.replies {
        print_thread(reply, depth + 1);
    }
}
