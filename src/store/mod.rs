//! Persisted conversation history.
//!
//! Messages are append-only; the read flag is the only column that is ever
//! updated. Both the realtime gateway and the REST handlers go through this
//! type so that conversation folding lives in exactly one place.

mod models;

use std::collections::{hash_map::Entry, HashMap};

use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

pub use models::{Conversation, Message, MessageDetails, MissionRef, Party, Thread};

use crate::{AppError, AppResult};

type MessageRow = (String, String, String, Option<String>, String, bool, i64, i64);

type DetailsRow = (
    String, String, String, Option<String>, String, bool, i64, i64,
    Option<String>, Option<String>,
    Option<String>, Option<String>,
    Option<String>,
);

type ConversationRow = (
    String, String, String, Option<String>, String, bool, i64, i64,
    Option<String>, Option<String>,
    Option<String>,
);

const MESSAGE_COLUMNS: &str =
    "m.id,m.sender_id,m.receiver_id,m.mission_id,m.content,m.read,m.created_at,m.updated_at";

#[derive(Clone)]
pub struct MessageStore {
    db_pool: SqlitePool,
}

impl MessageStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        MessageStore { db_pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    /// Stores a new unread message and returns it joined with sender,
    /// receiver and mission display data.
    ///
    /// Content and sender/receiver validation happen in the caller.
    pub async fn append(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        mission_id: Option<Uuid>,
    ) -> AppResult<MessageDetails> {
        let id = Uuid::now_v7();
        let now = now_millis();

        sqlx::query(
            "INSERT INTO messages (id,sender_id,receiver_id,mission_id,content,read,created_at,updated_at) \
             VALUES (?,?,?,?,?,0,?,?)",
        )
            .bind(id.to_string())
            .bind(sender_id.to_string())
            .bind(receiver_id.to_string())
            .bind(mission_id.as_ref().map(Uuid::to_string))
            .bind(content)
            .bind(now)
            .bind(now)
            .execute(&self.db_pool)
            .await?;

        self.details(id).await?.ok_or(AppError::NotFound("message"))
    }

    pub async fn details(&self, id: Uuid) -> AppResult<Option<MessageDetails>> {
        let row: Option<DetailsRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS},s.name,s.avatar,r.name,r.avatar,mi.title \
             FROM messages m \
             LEFT JOIN users s ON s.id=m.sender_id \
             LEFT JOIN users r ON r.id=m.receiver_id \
             LEFT JOIN missions mi ON mi.id=m.mission_id \
             WHERE m.id=?"
        ))
            .bind(id.to_string())
            .fetch_optional(&self.db_pool)
            .await?;

        let Some((id, sender, receiver, mission, content, read, created, updated, s_name, s_avatar, r_name, r_avatar, title)) = row else {
            return Ok(None);
        };

        let message = into_message((id, sender, receiver, mission, content, read, created, updated))?;
        Ok(Some(MessageDetails {
            sender: Party { id: message.sender_id, name: s_name, avatar: s_avatar },
            receiver: Party { id: message.receiver_id, name: r_name, avatar: r_avatar },
            mission: message.mission_id.map(|id| MissionRef { id, title }),
            message,
        }))
    }

    /// A page of the messages exchanged between `user_a` and `user_b`,
    /// optionally limited to one mission. Pages are cut newest-first and then
    /// returned in chronological order.
    pub async fn get_thread(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        mission_id: Option<Uuid>,
        page: u32,
        page_size: u32,
    ) -> AppResult<Thread> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let (a, b) = (user_a.to_string(), user_b.to_string());
        let mission = mission_id.as_ref().map(Uuid::to_string);

        const FILTER: &str = "((m.sender_id=? AND m.receiver_id=?) OR (m.sender_id=? AND m.receiver_id=?)) \
                              AND (? IS NULL OR m.mission_id=?)";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM messages m WHERE {FILTER}"))
            .bind(&a)
            .bind(&b)
            .bind(&b)
            .bind(&a)
            .bind(mission.as_deref())
            .bind(mission.as_deref())
            .fetch_one(&self.db_pool)
            .await?;

        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE {FILTER} \
             ORDER BY m.created_at DESC, m.id DESC LIMIT ? OFFSET ?"
        ))
            .bind(&a)
            .bind(&b)
            .bind(&b)
            .bind(&a)
            .bind(mission.as_deref())
            .bind(mission.as_deref())
            .bind(i64::from(page_size))
            .bind(i64::from(page - 1) * i64::from(page_size))
            .fetch_all(&self.db_pool)
            .await?;

        let mut messages = rows.into_iter().map(into_message).collect::<AppResult<Vec<_>>>()?;
        messages.reverse();

        Ok(Thread {
            messages,
            total,
            has_more: total > i64::from(page) * i64::from(page_size),
        })
    }

    /// Folds every message touching `user_id` into one entry per
    /// (counterpart, mission) pair, most recently active first.
    pub async fn get_conversations(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let user = user_id.to_string();
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS},u.name,u.avatar,mi.title \
             FROM messages m \
             LEFT JOIN users u ON u.id = CASE WHEN m.sender_id=? THEN m.receiver_id ELSE m.sender_id END \
             LEFT JOIN missions mi ON mi.id=m.mission_id \
             WHERE m.sender_id=? OR m.receiver_id=? \
             ORDER BY m.created_at DESC, m.id DESC"
        ))
            .bind(&user)
            .bind(&user)
            .bind(&user)
            .fetch_all(&self.db_pool)
            .await?;

        let mut index: HashMap<(Uuid, Option<Uuid>), usize> = HashMap::new();
        let mut conversations: Vec<Conversation> = Vec::new();

        // rows arrive newest first, so the first row seen for a key is its last message
        for (id, sender, receiver, mission, content, read, created, updated, name, avatar, title) in rows {
            let message = into_message((id, sender, receiver, mission, content, read, created, updated))?;
            let counterpart = if message.sender_id == user_id {
                message.receiver_id
            } else {
                message.sender_id
            };
            let unread = message.receiver_id == user_id && !message.read;

            let slot = match index.entry((counterpart, message.mission_id)) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    conversations.push(Conversation {
                        counterpart: Party { id: counterpart, name, avatar },
                        mission: message.mission_id.map(|id| MissionRef { id, title }),
                        last_message: message,
                        unread_count: 0,
                    });
                    *entry.insert(conversations.len() - 1)
                }
            };

            if unread {
                conversations[slot].unread_count += 1;
            }
        }

        Ok(conversations)
    }

    /// Flips every unread message from `sender_id` to `receiver_id` to read,
    /// optionally only within one mission. Returns how many rows changed.
    pub async fn mark_read(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
        mission_id: Option<Uuid>,
    ) -> AppResult<u64> {
        let mission = mission_id.as_ref().map(Uuid::to_string);
        let result = sqlx::query(
            "UPDATE messages SET read=1, updated_at=? \
             WHERE receiver_id=? AND sender_id=? AND read=0 AND (? IS NULL OR mission_id=?)",
        )
            .bind(now_millis())
            .bind(receiver_id.to_string())
            .bind(sender_id.to_string())
            .bind(mission.as_deref())
            .bind(mission.as_deref())
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Unread messages addressed to `user_id` across every conversation.
    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE receiver_id=? AND read=0")
            .bind(user_id.to_string())
            .fetch_one(&self.db_pool)
            .await?;

        Ok(count)
    }
}

fn now_millis() -> i64 {
    let now = OffsetDateTime::now_utc();
    now.unix_timestamp() * 1000 + i64::from(now.millisecond())
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Ok(Uuid::parse_str(raw).with_context(|| format!("malformed id {raw:?} in messages"))?)
}

fn parse_millis(millis: i64) -> AppResult<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .with_context(|| format!("timestamp {millis} out of range"))?)
}

fn into_message(
    (id, sender, receiver, mission, content, read, created, updated): MessageRow,
) -> AppResult<Message> {
    Ok(Message {
        id: parse_id(&id)?,
        sender_id: parse_id(&sender)?,
        receiver_id: parse_id(&receiver)?,
        mission_id: mission.as_deref().map(parse_id).transpose()?,
        content,
        read,
        created_at: parse_millis(created)?,
        updated_at: parse_millis(updated)?,
    })
}
