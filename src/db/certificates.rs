use rand::Rng;
use rusqlite::{params, Row};
use tracing::{info, warn};

use super::{display_name_sql, is_hex_color, is_unique_violation, timestamp, Database};
use crate::error::{LmsError, Result};
use crate::models::{Certificate, CertificateTemplate, Eligibility, NotificationKind};

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_LENGTH: usize = 10;
const MAX_ID_RETRIES: usize = 8;

pub fn generate_certificate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

fn certificate_select() -> String {
    format!(
        r#"
        SELECT c.id, c.enrollment_id, c.certificate_id, c.issued_at, c.is_active,
               u.id, {}, co.id, co.title
        FROM certificates c
        JOIN enrollments e ON e.id = c.enrollment_id
        JOIN users u ON u.id = e.student_id
        JOIN courses co ON co.id = e.course_id
        "#,
        display_name_sql("u")
    )
}

fn certificate_from_row(row: &Row<'_>) -> rusqlite::Result<Certificate> {
    Ok(Certificate {
        id: row.get(0)?,
        enrollment_id: row.get(1)?,
        certificate_id: row.get(2)?,
        issued_at: row.get(3)?,
        is_active: row.get(4)?,
        student_id: row.get(5)?,
        student_name: row.get(6)?,
        course_id: row.get(7)?,
        course_title: row.get(8)?,
    })
}

impl Database {
    pub fn check_eligibility(&self, student_id: i64, course_id: i64) -> Result<Eligibility> {
        let enrollment = self.require_enrollment(student_id, course_id)?;
        let progress = self.progress(enrollment.id)?.percentage;
        let threshold = self.certificate_threshold();

        Ok(Eligibility {
            course_id,
            progress,
            threshold,
            eligible: progress >= threshold,
            certificate: self.certificate_for_enrollment(enrollment.id)?,
        })
    }

    /// Issues the certificate for a finished course. Claiming twice returns
    /// the certificate issued the first time.
    pub fn claim_certificate(&self, student_id: i64, course_id: i64) -> Result<Certificate> {
        let eligibility = self.check_eligibility(student_id, course_id)?;
        if let Some(existing) = eligibility.certificate {
            return Ok(existing);
        }
        if !eligibility.eligible {
            warn!(student_id, course_id, progress = eligibility.progress, "Certificate refused");
            return Err(LmsError::NotEligible {
                progress: eligibility.progress,
                threshold: eligibility.threshold,
            });
        }
        let enrollment = self.require_enrollment(student_id, course_id)?;

        self.in_transaction(|db| {
            let mut issued = None;
            for _ in 0..MAX_ID_RETRIES {
                let candidate = generate_certificate_id();
                match db.conn.execute(
                    "INSERT INTO certificates (enrollment_id, certificate_id, issued_at) VALUES (?1, ?2, ?3)",
                    params![enrollment.id, candidate, timestamp()],
                ) {
                    Ok(_) => {
                        issued = Some(candidate);
                        break;
                    }
                    Err(e) if is_unique_violation(&e) => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            let certificate_id = issued
                .ok_or_else(|| LmsError::invalid("could not allocate a unique certificate id"))?;

            let certificate = db
                .get_certificate(&certificate_id)?
                .ok_or_else(|| LmsError::not_found("Certificate", &certificate_id))?;
            db.notify(
                student_id,
                NotificationKind::CertificateEarned,
                "Certificate earned",
                &format!(
                    "Your certificate for {} is ready (ID {}).",
                    certificate.course_title, certificate.certificate_id
                ),
                Some(course_id),
            )?;
            info!(certificate_id = %certificate.certificate_id, student_id, course_id, "Issued certificate");
            Ok(certificate)
        })
    }

    fn certificate_for_enrollment(&self, enrollment_id: i64) -> Result<Option<Certificate>> {
        let certificate = self.conn.query_row(
            &format!("{} WHERE c.enrollment_id = ?1", certificate_select()),
            params![enrollment_id],
            certificate_from_row,
        );

        match certificate {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_certificate(&self, certificate_id: &str) -> Result<Option<Certificate>> {
        let certificate = self.conn.query_row(
            &format!("{} WHERE c.certificate_id = ?1", certificate_select()),
            params![certificate_id.trim().to_uppercase()],
            certificate_from_row,
        );

        match certificate {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_student_certificates(&self, student_id: i64) -> Result<Vec<Certificate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE e.student_id = ?1 AND c.is_active = 1 ORDER BY c.issued_at DESC, c.id DESC",
            certificate_select()
        ))?;
        let rows = stmt.query_map(params![student_id], certificate_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Certificates issued for a course; staff only.
    pub fn list_course_certificates(&self, actor_id: i64, course_id: i64) -> Result<Vec<Certificate>> {
        self.require_course_staff(actor_id, course_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE e.course_id = ?1 ORDER BY c.issued_at DESC, c.id DESC",
            certificate_select()
        ))?;
        let rows = stmt.query_map(params![course_id], certificate_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The course's active template, or the stock one.
    pub fn get_template(&self, course_id: i64) -> Result<CertificateTemplate> {
        let template = self.conn.query_row(
            r#"
            SELECT id, course_id, title, description, font_size, text_color, is_active
            FROM certificate_templates
            WHERE course_id = ?1 AND is_active = 1
            "#,
            params![course_id],
            |row| {
                Ok(CertificateTemplate {
                    id: row.get(0)?,
                    course_id: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    font_size: row.get(4)?,
                    text_color: row.get(5)?,
                    is_active: row.get(6)?,
                })
            },
        );

        match template {
            Ok(t) => Ok(t),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(CertificateTemplate::fallback(course_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Updates the course template; unset fields keep their current value.
    pub fn set_template(
        &self,
        actor_id: i64,
        course_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        font_size: Option<i32>,
        text_color: Option<&str>,
    ) -> Result<CertificateTemplate> {
        self.require_course_staff(actor_id, course_id)?;

        let current = self.get_template(course_id)?;
        let title = title.map(str::trim).unwrap_or(&current.title);
        let description = description.map(str::trim).unwrap_or(&current.description);
        let font_size = font_size.unwrap_or(current.font_size);
        let text_color = text_color.map(str::trim).unwrap_or(&current.text_color);

        if title.is_empty() || description.is_empty() {
            return Err(LmsError::invalid("template title and description must not be empty"));
        }
        if !(6..=72).contains(&font_size) {
            return Err(LmsError::invalid("font size must be within 6..=72"));
        }
        if !is_hex_color(text_color) {
            return Err(LmsError::invalid(format!("'{text_color}' is not a #rrggbb colour")));
        }

        self.conn.execute(
            r#"
            INSERT INTO certificate_templates (course_id, title, description, font_size, text_color, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, 1)
            ON CONFLICT(course_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                font_size = excluded.font_size,
                text_color = excluded.text_color,
                is_active = 1
            "#,
            params![course_id, title, description, font_size, text_color],
        )?;
        info!(course_id, "Updated certificate template");
        self.get_template(course_id)
    }

    /// Plain-text rendering of a certificate through its course template.
    pub fn render_certificate(&self, certificate_id: &str) -> Result<String> {
        let certificate = self
            .get_certificate(certificate_id)?
            .ok_or_else(|| LmsError::not_found("Certificate", certificate_id))?;
        let template = self.get_template(certificate.course_id)?;
        Ok(render_text(&template, &certificate))
    }
}

pub fn render_text(template: &CertificateTemplate, certificate: &Certificate) -> String {
    let body = template
        .description
        .replace("{{ student }}", &certificate.student_name)
        .replace("{{ course }}", &certificate.course_title);
    let issued = chrono::DateTime::parse_from_rfc3339(&certificate.issued_at)
        .map(|dt| dt.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| certificate.issued_at.clone());
    let rule = "=".repeat(template.title.chars().count().max(40));

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&template.title);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n\n");
    out.push_str(&body);
    out.push_str("\n\n");
    out.push_str(&format!("Awarded to:     {}\n", certificate.student_name));
    out.push_str(&format!("Course:         {}\n", certificate.course_title));
    out.push_str(&format!("Issued:         {}\n", issued));
    out.push_str(&format!("Certificate ID: {}\n", certificate.certificate_id));
    out
}
