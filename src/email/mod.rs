use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::MailConfig;

/// Renders the HTML invitation body for a team member joining a client
/// workspace.
pub fn render_invitation(company_name: &str, invite_url: &str) -> String {
    format!(
        r#"<html>
  <body style="font-family: sans-serif; color: #1f2933;">
    <h2>You have been invited to join {company_name}</h2>
    <p>{company_name} uses this dashboard to manage their onboarding,
    documents and team access.</p>
    <p><a href="{invite_url}" style="background: #2563eb; color: #fff; padding: 10px 18px; border-radius: 6px; text-decoration: none;">Accept invitation</a></p>
    <p>If the button does not work, open this link: {invite_url}</p>
  </body>
</html>"#
    )
}

pub fn send_invitation(cfg: &MailConfig, to: &str, company_name: &str) -> Result<(), String> {
    let invite_url = format!("{}?email={}", cfg.invite_base_url, to);
    let body = render_invitation(company_name, &invite_url);

    let email = Message::builder()
        .from(
            cfg.from_address
                .parse()
                .map_err(|e| format!("Invalid from address: {}", e))?,
        )
        .to(to
            .parse()
            .map_err(|e| format!("Invalid to address: {}", e))?)
        .subject(format!("Invitation to join {company_name}"))
        .header(ContentType::TEXT_HTML)
        .body(body)
        .map_err(|e| format!("Failed to build email: {}", e))?;

    let mut mailer = SmtpTransport::relay(&cfg.smtp_server)
        .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
        .port(cfg.smtp_port);

    if !cfg.username.is_empty() {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        mailer = mailer.credentials(creds);
    }

    mailer
        .build()
        .send(&email)
        .map_err(|e| format!("Failed to send email: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_names_the_company() {
        let html = render_invitation("Acme Corp", "http://localhost/invite?email=a@b.c");
        assert!(html.contains("Acme Corp"));
        assert!(html.contains("http://localhost/invite?email=a@b.c"));
    }

    #[test]
    fn invitation_is_html() {
        let html = render_invitation("Acme", "http://x");
        assert!(html.starts_with("<html>"));
        assert!(html.contains("</html>"));
    }
}
