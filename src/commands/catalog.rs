use serde_json::json;

use super::{parse_role, Ctx};
use crate::cli::{CategoryCommands, CourseCommands, LessonArgs, UserCommands};
use crate::error::{LmsError, Result};
use crate::models::{ContentType, Course, NewLesson, Role};
use crate::text::truncate;

pub fn users(ctx: &Ctx<'_>, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Add {
            username,
            role,
            email,
            first,
            last,
        } => {
            let role = parse_role(&role)?;
            let id = ctx
                .db
                .add_user(&username, email.as_deref(), &first, &last, role)?;
            ctx.emit(&json!({ "id": id, "username": username }), || {
                println!("Added {} '{}' with ID: {}", role.as_str(), username.trim(), id)
            })
        }

        UserCommands::List { role } => {
            let role = role.as_deref().map(parse_role).transpose()?;
            let users = ctx.db.list_users(role)?;
            ctx.emit(&users, || {
                if users.is_empty() {
                    println!("No users found.");
                    return;
                }
                println!("{:<5} {:<20} {:<25} ROLE", "ID", "USERNAME", "NAME");
                println!("{}", "-".repeat(65));
                for user in &users {
                    println!(
                        "{:<5} {:<20} {:<25} {}",
                        user.id,
                        truncate(&user.username, 18),
                        truncate(&user.display_name(), 23),
                        user.role.label()
                    );
                }
            })
        }

        UserCommands::Show { username } => {
            let user = ctx.db.require_username(&username)?;
            ctx.emit(&user, || {
                println!("User: {} ({})", user.display_name(), user.username);
                println!("ID: {}", user.id);
                println!("Role: {}", user.role.label());
                if let Some(email) = &user.email {
                    println!("Email: {email}");
                }
                println!("Joined: {}", user.created_at);
            })
        }
    }
}

pub fn categories(ctx: &Ctx<'_>, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Add { name, description } => {
            ctx.actor()
                .and_then(|actor| ctx.db.require_role(actor.id, &[Role::Admin, Role::Instructor]))?;
            let id = ctx.db.add_category(&name, description.as_deref())?;
            ctx.emit(&json!({ "id": id, "name": name }), || {
                println!("Added category '{}' with ID: {}", name, id)
            })
        }

        CategoryCommands::List => {
            let categories = ctx.db.list_categories()?;
            ctx.emit(&categories, || {
                if categories.is_empty() {
                    println!("No categories found.");
                    return;
                }
                println!("{:<5} {:<30} COURSES", "ID", "CATEGORY");
                println!("{}", "-".repeat(50));
                for category in &categories {
                    println!(
                        "{:<5} {:<30} {}",
                        category.id,
                        truncate(&category.name, 28),
                        category.course_count
                    );
                }
            })
        }
    }
}

pub fn courses(ctx: &Ctx<'_>, cmd: CourseCommands) -> Result<()> {
    match cmd {
        CourseCommands::Add {
            title,
            description,
            category,
        } => {
            let actor = ctx.actor()?;
            let id = ctx
                .db
                .add_course(actor.id, &title, &description, category.as_deref())?;
            ctx.emit(&json!({ "id": id, "title": title }), || {
                println!("Created course '{}' with ID: {}", title, id)
            })
        }

        CourseCommands::List { all, category } => {
            let courses = ctx.db.list_courses(all, category.as_deref())?;
            print_courses(ctx, &courses)
        }

        CourseCommands::Taught => {
            let actor = ctx.actor()?;
            let courses = ctx.db.list_courses_taught(actor.id)?;
            print_courses(ctx, &courses)
        }

        CourseCommands::Show { id } => {
            let outline = ctx.db.course_outline(id)?;
            ctx.emit(&outline, || {
                let course = &outline.course;
                println!("Course: {} (ID: {})", course.title, course.id);
                println!("Instructor: {}", course.instructor_name);
                if let Some(category) = &course.category {
                    println!("Category: {category}");
                }
                if !course.description.is_empty() {
                    println!("Description: {}", course.description);
                }
                if !course.is_active {
                    println!("Status: archived");
                }
                println!("Lessons: {}", outline.lesson_count());

                for module in &outline.modules {
                    println!();
                    println!(
                        "[{}] {} (module {})",
                        module.module.order, module.module.title, module.module.id
                    );
                    if module.lessons.is_empty() {
                        println!("    (no lessons)");
                    }
                    for lesson in &module.lessons {
                        let duration = lesson
                            .duration_minutes
                            .map(|m| format!(" {m}m"))
                            .unwrap_or_default();
                        println!(
                            "    {:>3}. {:<40} {:<10} #{}{}",
                            lesson.order,
                            truncate(&lesson.title, 38),
                            lesson.content_type.as_str(),
                            lesson.id,
                            duration
                        );
                    }
                }
            })
        }

        CourseCommands::Archive { id } => {
            let actor = ctx.actor()?;
            ctx.db.set_course_active(actor.id, id, false)?;
            ctx.done(&format!("Course {id} archived."))
        }

        CourseCommands::Restore { id } => {
            let actor = ctx.actor()?;
            ctx.db.set_course_active(actor.id, id, true)?;
            ctx.done(&format!("Course {id} restored."))
        }

        CourseCommands::Module {
            course_id,
            title,
            description,
            order,
        } => {
            let actor = ctx.actor()?;
            let id = ctx
                .db
                .add_module(actor.id, course_id, &title, description.as_deref(), order)?;
            ctx.emit(&json!({ "id": id, "course_id": course_id, "title": title }), || {
                println!("Added module '{}' with ID: {}", title, id)
            })
        }

        CourseCommands::Lesson(args) => add_lesson(ctx, args),

        CourseCommands::Students { id } => {
            let actor = ctx.actor()?;
            // Roster doubles as the gradebook view for staff.
            let rows = ctx.db.instructor_gradebook(actor.id, id)?;
            ctx.emit(&rows, || {
                if rows.is_empty() {
                    println!("No students enrolled.");
                    return;
                }
                println!("{:<6} {:<25} {:>9}", "ENR", "STUDENT", "PROGRESS");
                println!("{}", "-".repeat(42));
                for row in &rows {
                    println!(
                        "{:<6} {:<25} {:>8.2}%",
                        row.enrollment_id,
                        truncate(&row.student_name, 23),
                        row.progress
                    );
                }
            })
        }
    }
}

fn add_lesson(ctx: &Ctx<'_>, args: LessonArgs) -> Result<()> {
    let actor = ctx.actor()?;
    let content_type = ContentType::from_str(&args.content_type).ok_or_else(|| {
        LmsError::invalid(format!(
            "Invalid content type '{}'. Use: text, video, pdf, quiz, or assignment",
            args.content_type
        ))
    })?;

    let lesson = NewLesson {
        title: &args.title,
        content_type,
        content: args.content.as_deref(),
        video_url: args.video_url.as_deref(),
        file_path: args.file.as_deref(),
        duration_minutes: args.duration,
        order: args.order,
    };
    let id = ctx.db.add_lesson(actor.id, args.module_id, &lesson)?;
    ctx.emit(&json!({ "id": id, "module_id": args.module_id, "title": args.title }), || {
        println!("Added lesson '{}' with ID: {}", args.title, id)
    })
}

fn print_courses(ctx: &Ctx<'_>, courses: &[Course]) -> Result<()> {
    ctx.emit(&courses, || {
        if courses.is_empty() {
            println!("No courses found.");
            return;
        }
        println!(
            "{:<5} {:<35} {:<20} {:<15} STATUS",
            "ID", "TITLE", "INSTRUCTOR", "CATEGORY"
        );
        println!("{}", "-".repeat(85));
        for course in courses {
            println!(
                "{:<5} {:<35} {:<20} {:<15} {}",
                course.id,
                truncate(&course.title, 33),
                truncate(&course.instructor_name, 18),
                truncate(course.category.as_deref().unwrap_or("-"), 13),
                if course.is_active { "active" } else { "archived" }
            );
        }
    })
}
