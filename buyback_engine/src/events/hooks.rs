use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    BalanceIncreasedEvent,
    CashbackPaidEvent,
    CashbackRejectedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderReminderEvent,
    ProductActivatedEvent,
};

/// The producer ends of the notification seam. The engine APIs hold one of these and publish into
/// it after each committed state transition; delivery is fire-and-log.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub cashback_paid_producer: Vec<EventProducer<CashbackPaidEvent>>,
    pub cashback_rejected_producer: Vec<EventProducer<CashbackRejectedEvent>>,
    pub product_activated_producer: Vec<EventProducer<ProductActivatedEvent>>,
    pub order_reminder_producer: Vec<EventProducer<OrderReminderEvent>>,
    pub balance_increased_producer: Vec<EventProducer<BalanceIncreasedEvent>>,
}

pub struct EventHandlers {
    pub on_cashback_paid: Option<EventHandler<CashbackPaidEvent>>,
    pub on_cashback_rejected: Option<EventHandler<CashbackRejectedEvent>>,
    pub on_product_activated: Option<EventHandler<ProductActivatedEvent>>,
    pub on_order_reminder: Option<EventHandler<OrderReminderEvent>>,
    pub on_balance_increased: Option<EventHandler<BalanceIncreasedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_cashback_paid: hooks.on_cashback_paid.map(|f| EventHandler::new(buffer_size, f)),
            on_cashback_rejected: hooks.on_cashback_rejected.map(|f| EventHandler::new(buffer_size, f)),
            on_product_activated: hooks.on_product_activated.map(|f| EventHandler::new(buffer_size, f)),
            on_order_reminder: hooks.on_order_reminder.map(|f| EventHandler::new(buffer_size, f)),
            on_balance_increased: hooks.on_balance_increased.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_cashback_paid {
            result.cashback_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_cashback_rejected {
            result.cashback_rejected_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_product_activated {
            result.product_activated_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_reminder {
            result.order_reminder_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_balance_increased {
            result.balance_increased_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_cashback_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_cashback_rejected {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_product_activated {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_reminder {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_balance_increased {
            tokio::spawn(handler.start_handler());
        }
    }
}

/// Builder for wiring notification callbacks. Each hook corresponds to one message the bot layer
/// knows how to send.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_cashback_paid: Option<Handler<CashbackPaidEvent>>,
    pub on_cashback_rejected: Option<Handler<CashbackRejectedEvent>>,
    pub on_product_activated: Option<Handler<ProductActivatedEvent>>,
    pub on_order_reminder: Option<Handler<OrderReminderEvent>>,
    pub on_balance_increased: Option<Handler<BalanceIncreasedEvent>>,
}

impl EventHooks {
    pub fn on_cashback_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CashbackPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_cashback_paid = Some(Arc::new(f));
        self
    }

    pub fn on_cashback_rejected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CashbackRejectedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_cashback_rejected = Some(Arc::new(f));
        self
    }

    pub fn on_product_activated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ProductActivatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_product_activated = Some(Arc::new(f));
        self
    }

    pub fn on_order_reminder<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderReminderEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_reminder = Some(Arc::new(f));
        self
    }

    pub fn on_balance_increased<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BalanceIncreasedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_balance_increased = Some(Arc::new(f));
        self
    }
}
