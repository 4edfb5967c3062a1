//! HTML bodies for outgoing mail

use super::MailMessage;

/// Minimal escaping for text interpolated into HTML bodies
pub fn escape(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn layout(heading: &str, body: &str, link: &str, button: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <body style="font-family: Helvetica, Arial, sans-serif; color: #1d1d1f;">
    <h2>{heading}</h2>
    {body}
    <p><a href="{link}" style="background:#111;color:#fff;padding:10px 18px;border-radius:4px;text-decoration:none;">{button}</a></p>
    <p style="font-size:12px;color:#888;">If the button does not work, paste this link into your browser:<br>{link}</p>
  </body>
</html>"#,
        heading = heading,
        body = body,
        link = escape(link),
        button = button,
    )
}

fn message_paragraph(message: Option<&str>) -> String {
    match message.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => format!("<p>{}</p>", escape(m).replace('\n', "<br>")),
        None => String::new(),
    }
}

pub fn contract_invitation(
    to: &str,
    signer_name: &str,
    sender_name: &str,
    subject: &str,
    message: Option<&str>,
    link: &str,
    expiry_days: i64,
) -> MailMessage {
    let body = format!(
        "<p>Hi {},</p><p>{} has sent you a contract to review and sign.</p>{}<p>This link expires in {} day{}.</p>",
        escape(signer_name),
        escape(sender_name),
        message_paragraph(message),
        expiry_days,
        if expiry_days == 1 { "" } else { "s" },
    );
    MailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: layout("You have a contract to sign", &body, link, "Review contract"),
    }
}

pub fn epk_invitation(to: &str, member_name: &str, sender_name: &str, epk_name: &str, subject: Option<&str>, message: Option<&str>, link: &str) -> MailMessage {
    let body = format!(
        "<p>Hi {},</p><p>{} added you to the press kit <strong>{}</strong>.</p>{}",
        escape(member_name),
        escape(sender_name),
        escape(epk_name),
        message_paragraph(message),
    );
    MailMessage {
        to: to.to_string(),
        subject: subject
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} invited you to collaborate on {}", sender_name, epk_name)),
        html: layout("You were added to an EPK team", &body, link, "Open EPK"),
    }
}

pub fn props_invitation(to: &str, member_name: &str, sender_name: &str, item: &str, link: &str) -> MailMessage {
    let body = format!(
        "<p>Hi {},</p><p>{} shared the prop <strong>{}</strong> with you.</p>",
        escape(member_name),
        escape(sender_name),
        escape(item),
    );
    MailMessage {
        to: to.to_string(),
        subject: format!("{} shared a prop with you", sender_name),
        html: layout("A prop was shared with you", &body, link, "View prop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_escapes_user_text() {
        let mail = contract_invitation(
            "s@x.io",
            "<Sam>",
            "Dana",
            "Please sign",
            Some("Line one\nLine <two>"),
            "https://app.test/app/contract/view/abc/sign?token=xyz",
            1,
        );
        assert_eq!(mail.to, "s@x.io");
        assert_eq!(mail.subject, "Please sign");
        assert!(mail.html.contains("Hi &lt;Sam&gt;"));
        assert!(mail.html.contains("Line one<br>Line &lt;two&gt;"));
        assert!(mail.html.contains("expires in 1 day."));
        assert!(mail.html.contains("https://app.test/app/contract/view/abc/sign?token=xyz"));
    }

    #[test]
    fn epk_invitation_defaults_subject() {
        let mail = epk_invitation("m@x.io", "Mo", "Dana", "Festival Kit", None, None, "https://app.test/app/epk/1");
        assert_eq!(mail.subject, "Dana invited you to collaborate on Festival Kit");
    }
}
