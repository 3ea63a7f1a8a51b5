use super::Ctx;
use crate::cli::CertCommands;
use crate::error::{LmsError, Result};
use crate::models::Certificate;
use crate::text::truncate;

pub fn run(ctx: &Ctx<'_>, cmd: CertCommands) -> Result<()> {
    match cmd {
        CertCommands::Check { course_id } => {
            let actor = ctx.actor()?;
            let eligibility = ctx.db.check_eligibility(actor.id, course_id)?;
            ctx.emit(&eligibility, || {
                println!(
                    "Progress: {:.2}% (certificate at {:.0}%)",
                    eligibility.progress, eligibility.threshold
                );
                match &eligibility.certificate {
                    Some(cert) => println!("Already issued: {}", cert.certificate_id),
                    None if eligibility.eligible => {
                        println!("Eligible. Claim with: lms cert claim {course_id}")
                    }
                    None => println!("Not yet eligible."),
                }
            })
        }

        CertCommands::Claim { course_id } => {
            let actor = ctx.actor()?;
            let cert = ctx.db.claim_certificate(actor.id, course_id)?;
            ctx.emit(&cert, || {
                println!(
                    "Certificate {} issued for '{}' on {}.",
                    cert.certificate_id, cert.course_title, cert.issued_at
                );
                println!("View it with: lms cert show {}", cert.certificate_id);
            })
        }

        CertCommands::List => {
            let actor = ctx.actor()?;
            let certs = ctx.db.list_student_certificates(actor.id)?;
            ctx.emit(&certs, || print_certificates(&certs))
        }

        CertCommands::Issued { course_id } => {
            let actor = ctx.actor()?;
            let certs = ctx.db.list_course_certificates(actor.id, course_id)?;
            ctx.emit(&certs, || print_certificates(&certs))
        }

        CertCommands::Show { certificate_id } => {
            let cert = ctx
                .db
                .get_certificate(&certificate_id)?
                .ok_or_else(|| LmsError::not_found("Certificate", &certificate_id))?;
            let text = ctx.db.render_certificate(&cert.certificate_id)?;
            ctx.emit(&serde_json::json!({ "certificate": cert, "text": text }), || {
                print!("{text}")
            })
        }

        CertCommands::Template {
            course_id,
            title,
            description,
            font_size,
            color,
        } => {
            let unchanged =
                title.is_none() && description.is_none() && font_size.is_none() && color.is_none();
            let template = if unchanged {
                ctx.db.get_template(course_id)?
            } else {
                let actor = ctx.actor()?;
                ctx.db.set_template(
                    actor.id,
                    course_id,
                    title.as_deref(),
                    description.as_deref(),
                    font_size,
                    color.as_deref(),
                )?
            };
            ctx.emit(&template, || {
                println!("Title: {}", template.title);
                println!("Description: {}", template.description);
                println!("Font size: {}", template.font_size);
                println!("Text colour: {}", template.text_color);
            })
        }
    }
}

fn print_certificates(certs: &[Certificate]) {
    if certs.is_empty() {
        println!("No certificates.");
        return;
    }
    println!("{:<12} {:<22} {:<30} ISSUED", "ID", "STUDENT", "COURSE");
    println!("{}", "-".repeat(90));
    for cert in certs {
        println!(
            "{:<12} {:<22} {:<30} {}",
            cert.certificate_id,
            truncate(&cert.student_name, 20),
            truncate(&cert.course_title, 28),
            cert.issued_at
        );
    }
}
