use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use parking_lot::Mutex;
use weft_core::{
    BoxError, Component, EventArgs, EventHandlerId, HandlerOutcome, RenderHandle,
    RenderTreeBuilder,
};
use weft_forms::{render_on_change, EditContext, EditContextError, FieldIdentifier, ListenerId};

pub const NAME_CHANGED: EventHandlerId = 1;
pub const EMAIL_CHANGED: EventHandlerId = 2;
pub const SAVE: EventHandlerId = 3;

pub const EMAIL_VALID: &str = "email_valid";

#[derive(Debug, Default)]
pub struct Person {
    pub name: Mutex<String>,
    pub email: Mutex<String>,
}

/// Checks the email address whenever validation is requested and records
/// the outcome in the context's properties.
pub fn install_email_validator(context: &EditContext) -> ListenerId {
    context.subscribe_validation_requested(|context| {
        let valid = context
            .model::<Person>()
            .is_some_and(|person| person.email.lock().contains('@'));
        context.properties().set(EMAIL_VALID, valid);
        context.notify_validation_state_changed()?;
        Ok(())
    })
}

pub struct PersonForm {
    context: EditContext,
    name: FieldIdentifier,
    email: FieldIdentifier,
    subscription: Option<ListenerId>,
}

impl PersonForm {
    pub fn new(context: EditContext) -> Result<Self, EditContextError> {
        Ok(Self {
            name: context.field("name")?,
            email: context.field("email")?,
            context,
            subscription: None,
        })
    }

    fn person(&self) -> Result<std::sync::Arc<Person>, BoxError> {
        self.context
            .model::<Person>()
            .ok_or_else(|| "edit context is not bound to a person".into())
    }

    fn status(&self) -> &'static str {
        match self.context.properties().get::<bool>(EMAIL_VALID).as_deref() {
            Some(false) => "email is invalid",
            _ if self.context.is_modified() => "unsaved changes",
            _ => "saved",
        }
    }

    fn save(&self) -> Result<HandlerOutcome, BoxError> {
        self.context.request_validation()?;
        if self.context.properties().get::<bool>(EMAIL_VALID).as_deref() != Some(&true) {
            return Err("refusing to save an invalid email address".into());
        }
        let (done, stored) = oneshot::channel();
        thread::spawn(move || {
            // Stands in for a round trip to a backing store.
            thread::sleep(Duration::from_millis(50));
            let _ = done.send(());
        });
        let context = self.context.clone();
        Ok(HandlerOutcome::pending(async move {
            stored.await?;
            log::info!("person saved");
            context.mark_as_unmodified();
            Ok::<(), BoxError>(())
        }))
    }
}

impl Component for PersonForm {
    fn attach(&mut self, handle: RenderHandle) {
        self.subscription = Some(render_on_change(&self.context, handle));
    }

    fn render(&mut self, builder: &mut RenderTreeBuilder) {
        let (name, email) = match self.person() {
            Ok(person) => (person.name.lock().clone(), person.email.lock().clone()),
            Err(err) => {
                log::error!("{err}");
                return;
            }
        };
        builder
            .open_element("form")
            .open_element("input")
            .add_attribute("value", name)
            .add_event_handler("onchange", NAME_CHANGED)
            .close_element()
            .open_element("input")
            .add_attribute("value", email)
            .add_event_handler("onchange", EMAIL_CHANGED)
            .close_element()
            .open_element("button")
            .add_event_handler("onclick", SAVE)
            .add_text("Save")
            .close_element()
            .add_text(self.status())
            .close_element();
    }

    fn handle_event(
        &mut self,
        handler_id: EventHandlerId,
        args: &EventArgs,
    ) -> Result<HandlerOutcome, BoxError> {
        let value = match args {
            EventArgs::Change { value } => value.clone(),
            _ => String::new(),
        };
        match handler_id {
            NAME_CHANGED => {
                *self.person()?.name.lock() = value;
                self.context.notify_field_changed(&self.name)?;
            }
            EMAIL_CHANGED => {
                *self.person()?.email.lock() = value;
                // Stale until validation runs again.
                self.context.properties().remove(EMAIL_VALID);
                self.context.notify_field_changed(&self.email)?;
            }
            SAVE => return self.save(),
            _ => {}
        }
        Ok(HandlerOutcome::Completed)
    }

    fn dispose(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.context.unsubscribe_field_changed(id);
        }
    }
}
