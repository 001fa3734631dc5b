//! Telegram adapter
//!
//! Implements [`Transport`] on a teloxide `Bot` and runs the update
//! dispatcher that feeds messages and button presses into the app.

use crate::ledger::Actor;
use crate::render::{Keyboard, OutgoingMessage, TextFormat};
use crate::runtime::{
    ChatTarget, IncomingCallback, IncomingMessage, Notice, ProductionApp, Transport,
    TransportError,
};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode, ThreadId, User,
};
use teloxide::{ApiError, RequestError};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.text.clone(), button.route.encode()))
            .collect::<Vec<_>>()
    }))
}

fn to_message_id(id: i64) -> Result<MessageId, TransportError> {
    i32::try_from(id)
        .map(MessageId)
        .map_err(|_| TransportError::NotEditable(id))
}

impl From<RequestError> for TransportError {
    fn from(e: RequestError) -> Self {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(
        &self,
        target: ChatTarget,
        message: &OutgoingMessage,
    ) -> Result<i64, TransportError> {
        let mut request = self
            .bot
            .send_message(ChatId(target.chat_id), message.text.clone());
        if message.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(markup(keyboard));
        }
        if let Some(thread) = target.thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread)));
        }
        let sent = request.await?;
        Ok(i64::from(sent.id.0))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.edit_message_text(
            ChatId(chat_id),
            to_message_id(message_id)?,
            message.text.clone(),
        );
        if message.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(markup(keyboard));
        }
        match request.await {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<Notice>,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(notice) = notice {
            request = request.text(notice.text).show_alert(notice.alert);
        }
        request.await?;
        Ok(())
    }
}

fn actor(user: &User) -> Actor {
    Actor::new(
        i64::try_from(user.id.0).unwrap_or_default(),
        user.first_name.clone(),
        user.last_name.clone(),
    )
}

fn thread_id(msg: &Message) -> Option<i32> {
    msg.thread_id.map(|ThreadId(MessageId(id))| id)
}

async fn on_message(msg: Message, app: Arc<ProductionApp>) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let incoming = IncomingMessage {
        chat: ChatTarget::new(msg.chat.id.0, thread_id(&msg)),
        message_id: i64::from(msg.id.0),
        actor: actor(user),
        text: text.to_string(),
    };
    app.handle_message(incoming).await;
    Ok(())
}

async fn on_callback(q: CallbackQuery, app: Arc<ProductionApp>) -> ResponseResult<()> {
    let Some(data) = q.data.clone() else {
        app.answer(&q.id, None).await;
        return Ok(());
    };
    let chat = q.message.as_ref().map(|m| {
        ChatTarget::new(
            m.chat().id.0,
            m.regular_message().and_then(thread_id),
        )
    });
    let incoming = IncomingCallback {
        id: q.id.clone(),
        chat,
        message_id: q.message.as_ref().map(|m| i64::from(m.id().0)),
        actor: actor(&q.from),
        data,
    };
    app.handle_callback(incoming).await;
    Ok(())
}

/// Dispatch updates until Ctrl-C
pub async fn run(bot: Bot, app: Arc<ProductionApp>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    tracing::info!(bot = %app.settings.bot_name, "Listening for updates");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    tracing::info!("Dispatcher stopped");
}
