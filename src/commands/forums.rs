use serde_json::json;

use super::{split_list, Ctx};
use crate::cli::ForumCommands;
use crate::error::{LmsError, Result};
use crate::text::truncate;

pub fn run(ctx: &Ctx<'_>, cmd: ForumCommands) -> Result<()> {
    match cmd {
        ForumCommands::Topics { course_id } => {
            let forum = ctx.db.forum_for_course(course_id)?;
            let topics = ctx.db.list_topics(course_id)?;
            ctx.emit(&json!({ "forum": forum, "topics": topics }), || {
                println!("{}", forum.title);
                if topics.is_empty() {
                    println!("No topics yet.");
                    return;
                }
                println!("{:<5} {:<40} {:<18} {:>5} FLAGS", "ID", "TOPIC", "AUTHOR", "POSTS");
                println!("{}", "-".repeat(80));
                for topic in &topics {
                    let mut flags = Vec::new();
                    if topic.is_pinned {
                        flags.push("pinned");
                    }
                    if topic.is_closed {
                        flags.push("closed");
                    }
                    println!(
                        "{:<5} {:<40} {:<18} {:>5} {}",
                        topic.id,
                        truncate(&topic.title, 38),
                        truncate(&topic.author_name, 16),
                        topic.post_count,
                        flags.join(",")
                    );
                }
            })
        }

        ForumCommands::New {
            course_id,
            title,
            content,
            tags,
        } => {
            let actor = ctx.actor()?;
            let tags = tags.as_deref().map(split_list).unwrap_or_default();
            let id = ctx
                .db
                .create_topic(actor.id, course_id, &title, &content, &tags)?;
            ctx.emit(&json!({ "id": id, "title": title }), || {
                println!("Started topic '{}' with ID: {}", title, id)
            })
        }

        ForumCommands::Show { topic_id } => {
            let topic = ctx
                .db
                .get_topic(topic_id)?
                .ok_or_else(|| LmsError::not_found("Topic", topic_id))?;
            let posts = ctx.db.list_posts(topic_id)?;
            ctx.emit(&json!({ "topic": topic, "posts": posts }), || {
                println!("{} (ID: {})", topic.title, topic.id);
                println!("by {} on {}", topic.author_name, topic.created_at);
                if !topic.tags.is_empty() {
                    println!("Tags: {}", topic.tags.join(", "));
                }
                if topic.is_closed {
                    println!("[closed]");
                }
                println!();
                println!("{}", topic.content);
                for post in &posts {
                    println!();
                    println!(
                        "--- #{} {} at {}{}",
                        post.id,
                        post.author_name,
                        post.created_at,
                        if post.is_edited { " (edited)" } else { "" }
                    );
                    println!("{}", post.content);
                }
            })
        }

        ForumCommands::Reply { topic_id, content } => {
            let actor = ctx.actor()?;
            let id = ctx.db.add_post(actor.id, topic_id, &content)?;
            ctx.emit(&json!({ "id": id, "topic_id": topic_id }), || {
                println!("Posted reply {id}.")
            })
        }

        ForumCommands::Edit { post_id, content } => {
            let actor = ctx.actor()?;
            ctx.db.edit_post(actor.id, post_id, &content)?;
            ctx.done(&format!("Post {post_id} updated."))
        }

        ForumCommands::Pin { topic_id, off } => {
            let actor = ctx.actor()?;
            ctx.db.set_pinned(actor.id, topic_id, !off)?;
            ctx.done(&format!(
                "Topic {topic_id} {}.",
                if off { "unpinned" } else { "pinned" }
            ))
        }

        ForumCommands::Close { topic_id, off } => {
            let actor = ctx.actor()?;
            ctx.db.set_closed(actor.id, topic_id, !off)?;
            ctx.done(&format!(
                "Topic {topic_id} {}.",
                if off { "reopened" } else { "closed" }
            ))
        }

        ForumCommands::Tags => {
            let tags = ctx.db.list_tags()?;
            ctx.emit(&tags, || {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for tag in &tags {
                    println!("{:<5} {:<30} {}", tag.id, tag.name, tag.color);
                }
            })
        }

        ForumCommands::TagColor { name, color } => {
            let actor = ctx.actor()?;
            if !actor.is_staff() {
                return Err(LmsError::PermissionDenied(
                    "only instructors and admins can recolour tags".to_string(),
                ));
            }
            ctx.db.set_tag_color(&name, &color)?;
            ctx.done(&format!("Tag '{name}' is now {color}."))
        }
    }
}
