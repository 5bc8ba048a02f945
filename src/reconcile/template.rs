use crate::identity::OnlineIdentity;
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};

lazy_static! {
    static ref ID_PLACEHOLDER: Regex = Regex::new(r"(?i)\{id\}").unwrap();
    static ref USERNAME_PLACEHOLDER: Regex = Regex::new(r"(?i)\{username\}").unwrap();
}

/// Substitutes `{id}` and `{username}` (any case, every occurrence).
pub fn render_command(template: &str, subject_key: &str, display_name: &str) -> String {
    let with_id = ID_PLACEHOLDER.replace_all(template, NoExpand(subject_key));
    USERNAME_PLACEHOLDER
        .replace_all(&with_id, NoExpand(display_name))
        .into_owned()
}

pub fn render_for(template: &str, identity: &OnlineIdentity) -> String {
    render_command(template, &identity.subject_key, &identity.display_name)
}

/// Notice sent when an occupant lacks the free slots a command needs.
pub fn slots_notice(required: u32) -> String {
    format!(
        "§cCannot claim reward, inventory needs {} empty slots! Trying again in 10 seconds...",
        required
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_all_placeholders_case_insensitively() {
        let rendered = render_command(
            "give {USERNAME} diamond 1; tag {id} vip; say {Username}",
            "uuid-1",
            "Steve",
        );
        assert_eq!(rendered, "give Steve diamond 1; tag uuid-1 vip; say Steve");
    }

    #[test]
    fn replacement_values_are_taken_literally() {
        let rendered = render_command("msg {username}", "k", "$1 ${name}");
        assert_eq!(rendered, "msg $1 ${name}");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        assert_eq!(render_command("kit {package}", "k", "n"), "kit {package}");
    }
}
