//! Plain-text rendering of API results.

use blogline_core::models::{
    Bookmark, Category, Comment, Follow, Like, Page, Post, PostDetail, Tag, User, UserProfile,
};

/// Characters of content shown per post in listings
const EXCERPT_CHARS: usize = 80;

pub fn print_usage() {
    println!(
        "Usage: blogline <command> [args]

Account:
  login [username]        Sign in (BLOGLINE_USERNAME / BLOGLINE_PASSWORD skip the prompts)
  logout                  Sign out and forget stored tokens
  whoami                  Show the signed-in user
  register                Create an account
  profile [--bio TEXT] [--location TEXT] [--website URL] [--avatar PATH]
                          Show or update your profile

Posts:
  posts [page]            List published posts
  post <id> [--json]      Show a post with its comments
  mine [page]             List your posts
  feed [page]             Posts from people you follow
  search <query>          Search posts
  delete-post <id>        Delete one of your posts

Social:
  comment <post> <text>   Comment on a post
  reply <post> <comment> <text>
                          Reply to a comment
  like <post>             Like or unlike a post
  bookmark <post>         Bookmark or unbookmark a post
  bookmarks [page]        List your bookmarks
  follow <user>           Follow or unfollow a user
  following | followers   List follows

Browse:
  categories | tags       List categories or tags

Set RUST_LOG=debug for verbose logs and BLOGLINE_LOG_DIR to also log to a file."
    );
}

pub fn print_posts(page: &Page<Post>) {
    if page.is_empty() {
        println!("No posts.");
        return;
    }
    for post in &page.results {
        println!(
            "#{:<5} {}  by {}  ({} likes, {} comments)",
            post.id,
            post.title,
            post.author.username,
            post.likes_count,
            post.comments_count
        );
        println!("       {}", post.excerpt(EXCERPT_CHARS));
    }
    print_page_footer(page);
}

pub fn print_post(detail: &PostDetail, likes: &Page<Like>) {
    let post = &detail.post;
    println!("{}", post.title);
    println!(
        "by {} on {}  [{}]",
        post.author.display_name(),
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.status.as_str()
    );
    if let Some(category) = &post.category {
        println!("Category: {}", category.name);
    }
    if !post.tags.is_empty() {
        let tags: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
        println!("Tags: {}", tags.join(", "));
    }
    println!();
    println!("{}", post.content.trim());
    println!();

    let mut flags = Vec::new();
    if post.is_liked {
        flags.push("liked");
    }
    if post.is_bookmarked {
        flags.push("bookmarked");
    }
    println!(
        "{} views, {} likes{}",
        post.views_count,
        post.likes_count,
        if flags.is_empty() { String::new() } else { format!(" ({})", flags.join(", ")) }
    );
    if !likes.is_empty() {
        let names: Vec<&str> = likes.results.iter().map(|l| l.user.username.as_str()).collect();
        println!("Liked by {}", names.join(", "));
    }

    if detail.comments.is_empty() {
        return;
    }
    let total: usize = detail.comments.iter().map(Comment::thread_len).sum();
    println!();
    println!("Comments ({})", total);
    for comment in &detail.comments {
        print_comment(comment, 1);
    }
}

fn print_comment(comment: &Comment, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}[{}] {} ({}): {}",
        indent,
        comment.id,
        comment.author.username,
        comment.created_at.format("%Y-%m-%d"),
        comment.content.trim()
    );
    for reply in &comment.replies {
        print_comment(reply, depth + 1);
    }
}

pub fn print_user(user: &User) {
    println!("{} (@{}, id {})", user.display_name(), user.username, user.id);
    if let Some(email) = &user.email {
        println!("Email: {}", email);
    }
    println!(
        "{} posts, {} followers, {} following",
        user.posts_count, user.followers_count, user.following_count
    );
    if let Some(profile) = &user.profile {
        print_profile(profile);
    }
}

pub fn print_profile(profile: &UserProfile) {
    let fields = [
        ("Bio", &profile.bio),
        ("Location", &profile.location),
        ("Website", &profile.website),
        ("Avatar", &profile.avatar),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
}

pub fn print_bookmarks(page: &Page<Bookmark>) {
    if page.is_empty() {
        println!("No bookmarks.");
        return;
    }
    for bookmark in &page.results {
        println!(
            "#{:<5} {}  by {}  (saved {})",
            bookmark.post.id,
            bookmark.post.title,
            bookmark.post.author.username,
            bookmark.created_at.format("%Y-%m-%d")
        );
    }
    print_page_footer(page);
}

pub fn print_follows(page: &Page<Follow>, user_of: impl Fn(&Follow) -> &User) {
    if page.is_empty() {
        println!("Nobody yet.");
        return;
    }
    for follow in &page.results {
        let user = user_of(follow);
        println!("{:<6} {} (@{})", user.id, user.display_name(), user.username);
    }
    print_page_footer(page);
}

pub fn print_categories(page: &Page<Category>) {
    for category in &page.results {
        println!("{:<20} {:<20} {} posts", category.name, category.slug, category.posts_count);
    }
    print_page_footer(page);
}

pub fn print_tags(page: &Page<Tag>) {
    for tag in &page.results {
        println!("{:<20} {:<20} {} posts", tag.name, tag.slug, tag.posts_count);
    }
    print_page_footer(page);
}

fn print_page_footer<T>(page: &Page<T>) {
    if page.has_next() || page.has_previous() {
        let more = if page.has_next() { ", more available" } else { "" };
        println!("-- {} of {} total{} --", page.results.len(), page.count, more);
    }
}
