//! Buyer/seller conversations.

use bazaar_core::{Chat, ChatId, Message};
use tracing::instrument;

use crate::ApiClient;
use crate::cache::{Tag, TagKind};
use crate::endpoint::{Mutation, Query};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::{MessageForm, StartChatForm};

/// `GET /chats`
pub struct Chats;

impl Query for Chats {
    const NAME: &'static str = "chats";
    type Args = ();
    type Output = Vec<Chat>;

    fn request((): &()) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get("/chats"))
    }

    fn provides((): &(), output: Option<&Vec<Chat>>) -> Vec<Tag> {
        std::iter::once(Tag::list(TagKind::Chat))
            .chain(
                output
                    .into_iter()
                    .flatten()
                    .map(|c| Tag::id(TagKind::Chat, c.id.as_str())),
            )
            .collect()
    }
}

/// `GET /chats/{id}/messages`
pub struct Messages;

impl Query for Messages {
    const NAME: &'static str = "messages";
    type Args = ChatId;
    type Output = Vec<Message>;

    fn request(chat: &ChatId) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::get(format!("/chats/{chat}/messages")))
    }

    fn provides(chat: &ChatId, _: Option<&Vec<Message>>) -> Vec<Tag> {
        vec![Tag::id(TagKind::Message, chat.as_str())]
    }
}

/// `POST /chats`. Returns the existing conversation if there is one.
pub struct StartChat;

impl Mutation for StartChat {
    const NAME: &'static str = "start_chat";
    type Args = StartChatForm;
    type Output = Chat;

    fn request(args: &StartChatForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/chats").json(args)
    }

    fn invalidates(_: &StartChatForm, _: &Chat) -> Vec<Tag> {
        vec![Tag::list(TagKind::Chat)]
    }
}

/// `POST /messages`
pub struct SendMessage;

impl Mutation for SendMessage {
    const NAME: &'static str = "send_message";
    type Args = MessageForm;
    type Output = Message;

    fn request(args: &MessageForm) -> Result<ApiRequest, ApiError> {
        ApiRequest::post("/messages").json(args)
    }

    // The chat list shows the latest message as a preview.
    fn invalidates(args: &MessageForm, _: &Message) -> Vec<Tag> {
        vec![
            Tag::id(TagKind::Message, args.chat.as_str()),
            Tag::id(TagKind::Chat, args.chat.as_str()),
        ]
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn chats(&self) -> Result<Vec<Chat>, ApiError> {
        self.query::<Chats>(&()).await
    }

    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self), fields(chat_id = %chat))]
    pub async fn messages(&self, chat: &ChatId) -> Result<Vec<Message>, ApiError> {
        self.query::<Messages>(chat).await
    }

    /// # Errors
    ///
    /// Returns an error if the receiver is missing or unknown.
    #[instrument(skip_all, fields(receiver = %form.receiver))]
    pub async fn start_chat(&self, form: &StartChatForm) -> Result<Chat, ApiError> {
        self.mutate::<StartChat>(form).await
    }

    /// # Errors
    ///
    /// Returns an error if the text is blank or too long, or the send fails.
    #[instrument(skip_all, fields(chat_id = %form.chat))]
    pub async fn send_message(&self, form: &MessageForm) -> Result<Message, ApiError> {
        self.mutate::<SendMessage>(form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_tags_are_per_chat() {
        let tags = Messages::provides(&ChatId::new("c1"), None);
        assert_eq!(tags, vec![Tag::id(TagKind::Message, "c1")]);

        // Sending in another chat leaves this one alone.
        let other = Tag::id(TagKind::Message, "c2");
        assert!(!other.matches(&tags[0]));
    }
}
