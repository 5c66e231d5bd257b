//! Telegram bot commands and the admin permission model.
//!
//! Two command contexts exist: the group chat accepts the per-address send
//! directive from any registered admin, and the private chat accepts
//! administrative commands from the super-admin only (`/start` and `/help`
//! answer anyone).

use super::dispatch::Outbound;
use super::Bridge;
use ponte_channels::telegram::TgChatMember;
use ponte_core::{error::PonteError, message::TgIncoming};
use ponte_store::Contact;
use std::collections::BTreeMap;
use tracing::info;

const HELP_TEXT: &str = "\
*Ponte — WhatsApp bridge*

*Group commands (any admin):*
`/chat_<number> <message>` — send a WhatsApp message to a number
Replying to a mirrored message also sends to its number.

*Private commands (super admin only):*
`/syscontact` — sync contacts from WhatsApp
`/show_contact` — list all stored contacts
`/show_admin` — list admins
`/show_user` — list Telegram group administrators
`/add_admin <id>` — add an admin
`/remove_admin <id>` — remove an admin";

/// Parse a `/chat_<address> <message>` directive.
pub(super) fn parse_chat_directive(text: &str) -> Result<(&str, &str), &'static str> {
    const USAGE: &str = "Wrong command format. Use: /chat_<number> <message>";

    let rest = text.strip_prefix("/chat_").ok_or(USAGE)?;
    let (address, message) = rest.split_once(' ').ok_or(USAGE)?;

    if address.is_empty() {
        return Err(USAGE);
    }
    if message.trim().is_empty() {
        return Err("Message cannot be empty");
    }

    Ok((address, message))
}

/// Contacts grouped by the uppercased first letter of the display name,
/// letters sorted, entries numbered per group.
pub(super) fn format_contact_list(contacts: &[Contact]) -> String {
    let mut by_letter: BTreeMap<String, Vec<&Contact>> = BTreeMap::new();
    for contact in contacts {
        let letter = contact
            .name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "#".to_string());
        by_letter.entry(letter).or_default().push(contact);
    }

    let mut out = String::from("*Contact List:*\n\n");
    for (letter, group) in &by_letter {
        out.push_str(&format!("*{letter}*\n"));
        for (i, contact) in group.iter().enumerate() {
            out.push_str(&format!("{}. {} ({})\n", i + 1, contact.name, contact.address));
        }
        out.push('\n');
    }
    out
}

pub(super) fn format_admin_list(admins: &[String], super_admin: &str) -> String {
    let mut out = String::from("*Admin List:*\n\n");
    for (i, id) in admins.iter().enumerate() {
        let tag = if id == super_admin {
            " (Super Admin)"
        } else {
            ""
        };
        out.push_str(&format!("{}. {id}{tag}\n", i + 1));
    }
    out
}

pub(super) fn format_member_list(members: &[TgChatMember]) -> String {
    let mut out = String::from("*Telegram Group Users:*\n\n");
    for (i, member) in members.iter().enumerate() {
        let mut name = member.user.first_name.clone();
        if let Some(ref last) = member.user.last_name {
            name.push(' ');
            name.push_str(last);
        }
        let tag = if member.status == "creator" {
            " (Group Creator)"
        } else {
            ""
        };
        out.push_str(&format!("{}. {name} ({}){tag}\n", i + 1, member.user.id));
    }
    out
}

impl Bridge {
    /// `/chat_<address> <message>` in the group: any registered admin.
    pub(super) async fn handle_group_directive(
        &self,
        msg: &TgIncoming,
        text: &str,
    ) -> Result<(), PonteError> {
        if !self.admins.is_admin(&msg.sender_id).await {
            self.group_notice(
                "You do not have permission to use this command",
                msg.message_id,
            )
            .await?;
            return Ok(());
        }

        match parse_chat_directive(text) {
            Ok((address, message)) => {
                self.dispatcher
                    .dispatch(address, Outbound::Text(message), msg.message_id)
                    .await;
            }
            Err(hint) => {
                self.group_notice(hint, msg.message_id).await?;
            }
        }
        Ok(())
    }

    /// Slash commands in a private chat with the bot.
    pub(super) async fn handle_private_command(
        &self,
        msg: &TgIncoming,
        text: &str,
    ) -> Result<(), PonteError> {
        let chat_id = msg.chat_id;
        let command = text.split_whitespace().next().unwrap_or(text);
        let args = text[command.len()..].trim();

        if command == "/start" || command == "/help" {
            self.tg.send_text(chat_id, HELP_TEXT, None, None).await?;
            return Ok(());
        }

        if !self.admins.is_super_admin(&msg.sender_id) {
            self.tg
                .send_text(
                    chat_id,
                    "You do not have permission to use this command. \
                     Only the super admin can.",
                    None,
                    None,
                )
                .await?;
            return Ok(());
        }

        match command {
            "/syscontact" => self.sync_contacts(chat_id).await,
            "/show_contact" => self.show_contacts(chat_id).await,
            "/show_admin" => self.show_admins(chat_id).await,
            "/show_user" => self.show_group_users(chat_id).await,
            "/add_admin" => self.add_admin(chat_id, args).await,
            "/remove_admin" => self.remove_admin(chat_id, args).await,
            _ => {
                self.tg
                    .send_text(chat_id, "Unknown command", None, None)
                    .await?;
                Ok(())
            }
        }
    }

    async fn sync_contacts(&self, chat_id: i64) -> Result<(), PonteError> {
        self.tg
            .send_text(chat_id, "Syncing contacts...", None, None)
            .await?;

        let contacts = match self.wa.contacts().await {
            Ok(c) => c,
            Err(e) => {
                self.tg
                    .send_text(chat_id, &format!("Contact sync failed: {e}"), None, None)
                    .await?;
                return Ok(());
            }
        };

        let mut count = 0;
        for contact in contacts {
            if let Some(name) = contact.name.filter(|n| !n.is_empty()) {
                self.store.upsert_contact(&contact.address, &name).await?;
                count += 1;
            }
        }

        info!("synced {count} whatsapp contacts");
        self.tg
            .send_text(
                chat_id,
                &format!("Synced {count} contacts successfully!"),
                None,
                None,
            )
            .await?;
        Ok(())
    }

    async fn show_contacts(&self, chat_id: i64) -> Result<(), PonteError> {
        let contacts = self.store.all_contacts().await?;
        if contacts.is_empty() {
            self.tg
                .send_text(chat_id, "No contacts found in database", None, None)
                .await?;
            return Ok(());
        }

        // send_text chunks long lists for transmission.
        self.tg
            .send_text(chat_id, &format_contact_list(&contacts), None, None)
            .await?;
        Ok(())
    }

    async fn show_admins(&self, chat_id: i64) -> Result<(), PonteError> {
        let admins = self.admins.list().await;
        let text = format_admin_list(&admins, self.admins.super_admin());
        self.tg.send_text(chat_id, &text, None, None).await?;
        Ok(())
    }

    async fn show_group_users(&self, chat_id: i64) -> Result<(), PonteError> {
        let members = match self.tg.get_chat_administrators(self.group_id).await {
            Ok(m) => m,
            Err(e) => {
                self.tg
                    .send_text(
                        chat_id,
                        &format!("Error fetching group members: {e}"),
                        None,
                        None,
                    )
                    .await?;
                return Ok(());
            }
        };

        self.tg
            .send_text(chat_id, &format_member_list(&members), None, None)
            .await?;
        self.tg
            .send_text(
                chat_id,
                "Note: Only group administrators are shown. The Bot API does not \
                 let bots enumerate ordinary group members.",
                None,
                None,
            )
            .await?;
        Ok(())
    }

    async fn add_admin(&self, chat_id: i64, args: &str) -> Result<(), PonteError> {
        if args.is_empty() {
            self.tg
                .send_text(chat_id, "Please provide a Telegram user ID", None, None)
                .await?;
            return Ok(());
        }

        self.admins.add(args).await?;
        info!("admin added: {args}");
        self.tg
            .send_text(chat_id, &format!("Admin added: {args}"), None, None)
            .await?;
        Ok(())
    }

    async fn remove_admin(&self, chat_id: i64, args: &str) -> Result<(), PonteError> {
        if args.is_empty() {
            self.tg
                .send_text(chat_id, "Please provide a Telegram user ID", None, None)
                .await?;
            return Ok(());
        }

        match self.admins.remove(args).await {
            Ok(()) => {
                info!("admin removed: {args}");
                self.tg
                    .send_text(chat_id, &format!("Admin removed: {args}"), None, None)
                    .await?;
            }
            Err(PonteError::Validation(reason)) => {
                self.tg.send_text(chat_id, &reason, None, None).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Post a notice in the group, replying to the triggering message.
    pub(super) async fn group_notice(&self, text: &str, reply_to: i64) -> Result<(), PonteError> {
        self.tg
            .send_text(
                self.group_id,
                text,
                Some(self.topic_primary),
                Some(reply_to),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponte_channels::telegram::TgMemberUser;

    #[test]
    fn test_parse_directive_ok() {
        let (address, message) = parse_chat_directive("/chat_6281234567 hello there").unwrap();
        assert_eq!(address, "6281234567");
        assert_eq!(message, "hello there");
    }

    #[test]
    fn test_parse_directive_no_space() {
        let err = parse_chat_directive("/chat_6281234567").unwrap_err();
        assert!(err.contains("/chat_"));
    }

    #[test]
    fn test_parse_directive_empty_address() {
        assert!(parse_chat_directive("/chat_ hello").is_err());
    }

    #[test]
    fn test_parse_directive_empty_message() {
        let err = parse_chat_directive("/chat_628 ").unwrap_err();
        assert_eq!(err, "Message cannot be empty");
    }

    #[test]
    fn test_parse_directive_message_kept_verbatim() {
        // Only the first space splits; the rest of the message is untouched.
        let (_, message) = parse_chat_directive("/chat_628  two  spaces ").unwrap();
        assert_eq!(message, " two  spaces ");
    }

    fn contact(address: &str, name: &str) -> Contact {
        Contact {
            address: address.into(),
            name: name.into(),
        }
    }

    #[test]
    fn test_contact_list_grouped_and_numbered() {
        let contacts = [
            contact("111", "Alice"),
            contact("222", "Andy"),
            contact("333", "Bob"),
        ];
        let text = format_contact_list(&contacts);

        assert!(text.starts_with("*Contact List:*"));
        let a_pos = text.find("*A*").unwrap();
        let b_pos = text.find("*B*").unwrap();
        assert!(a_pos < b_pos, "letters must be sorted");
        assert!(text.contains("1. Alice (111)"));
        assert!(text.contains("2. Andy (222)"));
        // Numbering restarts per group.
        assert!(text.contains("1. Bob (333)"));
    }

    #[test]
    fn test_contact_list_uppercases_first_letter() {
        let contacts = [contact("111", "alice")];
        let text = format_contact_list(&contacts);
        assert!(text.contains("*A*"));
        assert!(text.contains("1. alice (111)"));
    }

    #[test]
    fn test_admin_list_flags_super_admin() {
        let admins = ["100".to_string(), "200".to_string()];
        let text = format_admin_list(&admins, "100");
        assert!(text.contains("1. 100 (Super Admin)"));
        assert!(text.contains("2. 200\n"));
        assert!(!text.contains("2. 200 (Super Admin)"));
    }

    #[test]
    fn test_member_list_flags_creator() {
        let members = [
            TgChatMember {
                user: TgMemberUser {
                    id: 1,
                    first_name: "Owner".into(),
                    last_name: None,
                },
                status: "creator".into(),
            },
            TgChatMember {
                user: TgMemberUser {
                    id: 2,
                    first_name: "Mod".into(),
                    last_name: Some("Two".into()),
                },
                status: "administrator".into(),
            },
        ];
        let text = format_member_list(&members);
        assert!(text.contains("1. Owner (1) (Group Creator)"));
        assert!(text.contains("2. Mod Two (2)\n"));
    }
}
