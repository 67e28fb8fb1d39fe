//! `chat list|open|send`.

use bazaar_client::store::Action;
use bazaar_client::validation::{MessageForm, StartChatForm};
use bazaar_core::{ChatId, UserId};
use clap::Subcommand;

use super::{CliError, Context, render};

#[derive(Subcommand)]
pub enum ChatAction {
    /// Your conversations
    List,
    /// Start (or reopen) a conversation with a user and show it
    Open { user: String },
    /// Show a conversation
    Show { chat: String },
    /// Send a message
    Send {
        chat: String,
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },
}

pub async fn run(ctx: &mut Context, action: ChatAction) -> Result<(), CliError> {
    ctx.require_login()?;
    let me = ctx.store.state().auth.user.as_ref().map(|u| u.id.clone());

    match action {
        ChatAction::List => {
            let result = ctx.client.chats().await;
            render::chats(&ctx.read(result)?, me.as_ref());
        }
        ChatAction::Open { user } => {
            let form = StartChatForm {
                receiver: UserId::new(user),
            };
            let result = ctx.client.start_chat(&form).await;
            let chat = ctx.read(result)?;
            ctx.store.dispatch(Action::SelectChat(chat.id.clone()));
            show(ctx, &chat.id, me.as_ref()).await?;
        }
        ChatAction::Show { chat } => {
            let chat = ChatId::new(chat);
            ctx.store.dispatch(Action::SelectChat(chat.clone()));
            show(ctx, &chat, me.as_ref()).await?;
        }
        ChatAction::Send { chat, text } => {
            let form = MessageForm {
                chat: ChatId::new(chat),
                text: text.join(" "),
            };
            let result = ctx.client.send_message(&form).await;
            ctx.report(result, "Sent")?;
            show(ctx, &form.chat, me.as_ref()).await?;
        }
    }
    Ok(())
}

async fn show(ctx: &mut Context, chat: &ChatId, me: Option<&UserId>) -> Result<(), CliError> {
    let result = ctx.client.messages(chat).await;
    render::messages(&ctx.read(result)?, me);
    Ok(())
}
