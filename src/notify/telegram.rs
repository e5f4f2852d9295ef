//! Telegram `sendMessage` notifications.

use crate::config::TelegramConfig;
use crate::entity::Order;
use chrono::SecondsFormat;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde_json::json;
use std::thread;
use std::time::Duration;

const QUEUE_CAPACITY: usize = 256;
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const NOT_PROVIDED: &str = "Not provided";

/// Handle used by checkout. Cloning shares the queue.
#[derive(Clone)]
pub struct Notifier {
    queue: Option<Sender<Order>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self { queue: None }
    }

    /// Start the worker if notifications are enabled and fully configured.
    pub fn from_config(config: &TelegramConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let (Some(token), Some(chat_id)) = (
            config.bot_token.as_deref().filter(|t| !t.is_empty()),
            config.chat_id.as_deref().filter(|c| !c.is_empty()),
        ) else {
            log::warn!("Telegram is enabled but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID is missing.");
            return Self::disabled();
        };

        let http = match reqwest::blocking::Client::builder().timeout(SEND_TIMEOUT).build() {
            Ok(http) => http,
            Err(e) => {
                log::error!("failed to build Telegram HTTP client, notifications disabled: {e}");
                return Self::disabled();
            }
        };
        let client = TelegramClient {
            http,
            url: format!("{}/bot{}/sendMessage", config.api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        };
        let (tx, rx) = bounded(QUEUE_CAPACITY);
        match thread::Builder::new()
            .name("telegram-notifier".to_string())
            .spawn(move || client.run(rx))
        {
            Ok(_) => {
                log::info!("Telegram order notifications enabled");
                Self { queue: Some(tx) }
            }
            Err(e) => {
                log::error!("failed to start Telegram worker, notifications disabled: {e}");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.queue.is_some()
    }

    /// Queue a notice for `order`. Never blocks; a full queue drops it.
    pub fn order_created(&self, order: &Order) {
        let Some(queue) = &self.queue else {
            return;
        };
        match queue.try_send(order.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                record_failure();
                log::warn!("notification queue full, dropping notice for order {}", order.id);
            }
            Err(TrySendError::Disconnected(_)) => {
                record_failure();
                log::warn!("notification worker stopped, dropping notice for order {}", order.id);
            }
        }
    }
}

fn record_failure() {
    #[cfg(feature = "metrics")]
    crate::metrics::METRICS.record_notification_failure();
}

struct TelegramClient {
    http: reqwest::blocking::Client,
    url: String,
    chat_id: String,
}

impl TelegramClient {
    fn run(self, orders: Receiver<Order>) {
        for order in orders {
            self.send(&build_order_message(&order));
        }
        log::debug!("telegram notifier stopped");
    }

    fn send(&self, text: &str) {
        let payload = json!({ "chat_id": self.chat_id, "text": text });
        match self.http.post(&self.url).json(&payload).send() {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                record_failure();
                let status = response.status();
                let body = response.text().unwrap_or_default();
                log::warn!("Telegram send failed ({status}). {body}");
            }
            Err(e) => {
                record_failure();
                log::warn!("Telegram send failed: {e}");
            }
        }
    }
}

/// `1234` -> `$12.34`
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

fn or_not_provided(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(NOT_PROVIDED)
}

/// Plain-text summary of a new order.
pub fn build_order_message(order: &Order) -> String {
    let locality = [
        order.shipping_city_province.as_deref(),
        order.shipping_district.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(", ");
    let mut address: Vec<&str> = Vec::new();
    address.extend(order.shipping_street.as_deref().filter(|s| !s.is_empty()));
    address.extend(order.shipping_house.as_deref().filter(|s| !s.is_empty()));
    if !locality.is_empty() {
        address.push(&locality);
    }

    let mut lines = vec![
        "New order created".to_string(),
        format!("Order ID: {}", order.id),
        format!("Status: {}", order.status),
        format!("Total: {}", format_money(order.total_cents)),
        format!(
            "Created: {}",
            order.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        String::new(),
        "Customer".to_string(),
        format!(
            "Email: {}",
            or_not_provided(order.user.as_ref().map(|u| u.email.as_str()))
        ),
        String::new(),
        "Shipping".to_string(),
        format!("Name: {}", or_not_provided(order.shipping_name.as_deref())),
        format!("Phone: {}", or_not_provided(order.shipping_phone.as_deref())),
        "Address:".to_string(),
        if address.is_empty() {
            NOT_PROVIDED.to_string()
        } else {
            address.join("\n")
        },
        String::new(),
        "Items".to_string(),
    ];
    for (index, item) in order.items.iter().enumerate() {
        let title = item
            .product
            .as_ref()
            .map_or("Unknown product", |p| p.title.as_str());
        lines.push(format!(
            "{}. {} x{} @ {}",
            index + 1,
            title,
            item.quantity,
            format_money(item.price_cents)
        ));
    }
    lines.join("\n")
}
