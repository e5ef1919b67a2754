mod console;
mod person_form;

use std::error::Error;
use std::sync::Arc;

use weft_core::{DispatcherHandle, EventArgs, Renderer};
use weft_forms::EditContext;
use weft_runtime_std::StdDispatcher;

use console::ConsoleSurface;
use person_form::{install_email_validator, Person, PersonForm, EMAIL_CHANGED, NAME_CHANGED, SAVE};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Weft Form Example ===");
    println!("Edits a person record and prints every render batch.");
    println!("Set RUST_LOG=debug to follow dispatch and render passes.");
    println!();

    let dispatcher = DispatcherHandle::new(StdDispatcher::with_thread_name("form-ui")?);
    let renderer = Renderer::new(dispatcher, ConsoleSurface);

    let context = EditContext::new(Arc::new(Person::default()));
    install_email_validator(&context);
    context.subscribe_field_changed(|_, field| {
        log::info!("field `{field}` modified");
        Ok(())
    });

    let form = renderer.assign_root_component_id(PersonForm::new(context.clone())?)?;
    renderer.render_root_component(form)?;

    renderer.dispatch_event(form, NAME_CHANGED, EventArgs::change("Ada Lovelace"))?;
    renderer.dispatch_event(form, EMAIL_CHANGED, EventArgs::change("ada.lovelace"))?;
    println!("modified fields: {:?}", field_names(&context));

    if let Err(err) = renderer.dispatch_event(form, SAVE, EventArgs::Empty) {
        log::warn!("save rejected: {err}");
        println!("save rejected: {err}");
    }

    renderer.dispatch_event(form, EMAIL_CHANGED, EventArgs::change("ada@analytical.engine"))?;
    renderer.dispatch_event(form, SAVE, EventArgs::Empty)?;
    println!("modified after save: {}", context.is_modified());

    renderer.remove_root_component(form)?;
    Ok(())
}

fn field_names(context: &EditContext) -> Vec<String> {
    let mut names: Vec<String> = context
        .modified_fields()
        .iter()
        .map(|field| field.field_name().to_owned())
        .collect();
    names.sort();
    names
}
