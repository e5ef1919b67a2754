use crate::EventHandlerId;

/// One entry of a component's rendered output.
///
/// Output is a flat sequence; an `Element` frame owns the `subtree_length - 1`
/// frames that follow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderFrame {
    Element { name: String, subtree_length: usize },
    Text(String),
    Attribute { name: String, value: String },
    EventHandler { name: String, handler_id: EventHandlerId },
    Markup(String),
}

impl RenderFrame {
    pub fn text(value: impl Into<String>) -> Self {
        RenderFrame::Text(value.into())
    }

    pub fn event_handler_id(&self) -> Option<EventHandlerId> {
        match self {
            RenderFrame::EventHandler { handler_id, .. } => Some(*handler_id),
            _ => None,
        }
    }
}

/// Collects the frames a component emits during one render.
#[derive(Debug, Default)]
pub struct RenderTreeBuilder {
    frames: Vec<RenderFrame>,
    open_elements: Vec<usize>,
}

impl RenderTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_element(&mut self, name: impl Into<String>) -> &mut Self {
        self.open_elements.push(self.frames.len());
        self.frames.push(RenderFrame::Element {
            name: name.into(),
            subtree_length: 0,
        });
        self
    }

    /// Closes the innermost open element. Unbalanced closes are ignored.
    pub fn close_element(&mut self) -> &mut Self {
        if let Some(start) = self.open_elements.pop() {
            let length = self.frames.len() - start;
            if let Some(RenderFrame::Element { subtree_length, .. }) = self.frames.get_mut(start) {
                *subtree_length = length;
            }
        } else {
            log::warn!("close_element called without an open element");
        }
        self
    }

    pub fn add_text(&mut self, value: impl Into<String>) -> &mut Self {
        self.frames.push(RenderFrame::Text(value.into()));
        self
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.frames.push(RenderFrame::Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn add_event_handler(
        &mut self,
        name: impl Into<String>,
        handler_id: EventHandlerId,
    ) -> &mut Self {
        self.frames.push(RenderFrame::EventHandler {
            name: name.into(),
            handler_id,
        });
        self
    }

    pub fn add_markup(&mut self, markup: impl Into<String>) -> &mut Self {
        self.frames.push(RenderFrame::Markup(markup.into()));
        self
    }

    pub fn frames(&self) -> &[RenderFrame] {
        &self.frames
    }

    /// Closes any element left open and yields the collected frames.
    pub fn finish(mut self) -> Vec<RenderFrame> {
        while !self.open_elements.is_empty() {
            self.close_element();
        }
        self.frames
    }
}
