use iocraft::prelude::*;
use tokio::sync::watch;

use crate::builder::sizes::{CUSTOM_SIZE_ID, STANDARD_SIZES};
use crate::builder::staging::MediaKind;
use crate::notifications::{NotificationSnapshot, badge};
use crate::rest_types::{Notification, Template};

#[derive(Default, Props)]
pub struct MessageProps {
    pub message: String,
}

#[component]
pub fn ErrorMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Red, weight: Weight::Bold, content: "✗ ")
            Text(color: Color::Red, content: &props.message)
        }
    }
}

#[component]
pub fn SuccessMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Green, weight: Weight::Bold, content: "✓ ")
            Text(color: Color::Green, content: &props.message)
        }
    }
}

#[component]
pub fn InfoMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Cyan, content: "• ")
            Text(content: &props.message)
        }
    }
}

#[derive(Default, Props)]
pub struct InputPromptProps {
    pub prompt: String,
    pub default: Option<String>,
    pub description: Option<String>,
}

#[component]
pub fn InputPrompt(props: &InputPromptProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            View(flex_direction: FlexDirection::Row) {
                Text(weight: Weight::Bold, content: &props.prompt)
                #(props.default.as_ref().map(|default| element! {
                    Text(color: Color::DarkGrey, content: format!(" [{}]", default))
                }))
            }
            #(props.description.as_ref().map(|description| element! {
                Text(color: Color::DarkGrey, content: description)
            }))
        }
    }
}

#[component]
pub fn ConfigHeader() -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            View(background_color: Color::Blue) {
                Text(color: Color::White, weight: Weight::Bold, content: " pbadmin configuration ")
            }
            Text(content: "Press enter to accept the value in brackets.")
        }
    }
}

#[derive(Default, Props)]
pub struct StepHeaderProps {
    pub title: String,
    pub subtitle: String,
}

#[component]
pub fn StepHeader(props: &StepHeaderProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            Text(content: "")
            View(flex_direction: FlexDirection::Row) {
                Text(content: "┌ ")
                View(background_color: Color::Blue) {
                    Text(color: Color::White, content: &props.title)
                }
            }
            Text(content: format!("└ {}", props.subtitle))
        }
    }
}

#[derive(Default, Props)]
pub struct SizeListProps {
    pub selected: Option<String>,
}

#[component]
pub fn SizeList(props: &SizeListProps) -> impl Into<AnyElement<'static>> {
    let selected = props.selected.as_deref();
    element! {
        View(flex_direction: FlexDirection::Column) {
            #(STANDARD_SIZES.iter().map(|size| {
                let marker = if selected == Some(size.id) { "◆" } else { "◇" };
                element! {
                    View(flex_direction: FlexDirection::Row) {
                        Text(color: Color::Cyan, content: format!("{} ", marker))
                        Text(weight: Weight::Bold, content: format!("{:<6}", size.id))
                        Text(content: format!("{:<6} {}", size.title, size.description))
                    }
                }
            }))
            View(flex_direction: FlexDirection::Row) {
                Text(color: Color::Cyan, content: if selected == Some(CUSTOM_SIZE_ID) { "◆ " } else { "◇ " })
                Text(weight: Weight::Bold, content: format!("{:<6}", CUSTOM_SIZE_ID))
                Text(content: "Enter your own width and height")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SlotRow {
    pub label: String,
    pub file: Option<(String, MediaKind)>,
}

#[derive(Default, Props)]
pub struct UploadSlotsProps {
    pub slots: Vec<SlotRow>,
}

#[component]
pub fn UploadSlots(props: &UploadSlotsProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            #(props.slots.iter().map(|slot| {
                let (color, status) = match &slot.file {
                    Some((name, MediaKind::Pdf)) => (Color::Green, format!("{} (PDF)", name)),
                    Some((name, MediaKind::Image)) => (Color::Green, format!("{} (image)", name)),
                    None => (Color::Yellow, "not uploaded".to_string()),
                };
                element! {
                    View(flex_direction: FlexDirection::Row) {
                        Text(weight: Weight::Bold, content: format!("{:<16}", slot.label))
                        Text(color: color, content: status)
                    }
                }
            }))
        }
    }
}

#[derive(Default, Props)]
pub struct TemplatesListProps {
    pub templates: Vec<Template>,
    pub page: u64,
    pub total_pages: u64,
}

#[component]
pub fn TemplatesList(props: &TemplatesListProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            #(props.templates.iter().map(|template| {
                let record = &template.record;
                element! {
                    View(flex_direction: FlexDirection::Row) {
                        Text(color: Color::DarkGrey, content: format!("{:<26}", template.id))
                        Text(weight: Weight::Bold, content: format!("{:<28}", record.name))
                        Text(content: format!(
                            "{} × {} {}  {}  {}",
                            record.template_width,
                            record.template_height,
                            record.unit,
                            record.category,
                            record.orientation
                        ))
                    }
                }
            }))
            #((props.total_pages > 0).then(|| element! {
                Text(color: Color::DarkGrey, content: format!("Page {} of {}", props.page, props.total_pages))
            }))
        }
    }
}

#[derive(Default, Props)]
pub struct NotificationsListProps {
    pub notifications: Vec<Notification>,
    pub unread: u64,
}

#[component]
pub fn NotificationsList(props: &NotificationsListProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            View(flex_direction: FlexDirection::Row) {
                Text(weight: Weight::Bold, content: "Notifications ")
                View(background_color: if props.unread > 0 { Color::Red } else { Color::DarkGrey }) {
                    Text(color: Color::White, content: format!(" {} unread ", badge(props.unread)))
                }
            }
            #(props.notifications.iter().map(|notification| {
                let marker_color = if notification.is_read { Color::DarkGrey } else { Color::Cyan };
                element! {
                    View(flex_direction: FlexDirection::Column) {
                        Text(content: "│")
                        View(flex_direction: FlexDirection::Row) {
                            Text(color: marker_color, content: if notification.is_read { "◇ " } else { "◆ " })
                            Text(weight: Weight::Bold, content: &notification.title)
                            Text(color: Color::DarkGrey, content: format!("  {}", notification.id))
                        }
                        Text(content: format!("│ {}", notification.message))
                        #(notification.created_at.as_ref().map(|created_at| element! {
                            Text(color: Color::DarkGrey, content: format!("│ {}", created_at))
                        }))
                    }
                }
            }))
        }
    }
}

#[derive(Default, Props)]
pub struct FollowNotificationsProps {
    pub snapshots: Option<watch::Receiver<NotificationSnapshot>>,
}

#[component]
pub fn FollowNotifications(
    props: &FollowNotificationsProps,
    mut hooks: Hooks,
) -> impl Into<AnyElement<'static>> {
    let mut snapshot = hooks.use_state(NotificationSnapshot::default);
    let receiver = props.snapshots.clone();

    hooks.use_future(async move {
        let Some(mut receiver) = receiver else {
            return;
        };
        loop {
            let current = receiver.borrow_and_update().clone();
            snapshot.set(current);
            if receiver.changed().await.is_err() {
                break;
            }
        }
    });

    let current = snapshot.read().clone();

    element! {
        View(flex_direction: FlexDirection::Column) {
            NotificationsList(notifications: current.recent, unread: current.unread)
            View(flex_direction: FlexDirection::Row) {
                Spinner()
                Text(color: Color::DarkGrey, content: format!(" polled {} time(s), Ctrl-C to stop", current.polls))
            }
        }
    }
}

#[derive(Default, Props)]
pub struct SpinnerProps {
    pub color: Option<Color>,
}

#[component]
pub fn Spinner(props: &SpinnerProps, mut hooks: Hooks) -> impl Into<AnyElement<'static>> {
    let mut frame = hooks.use_state(|| 0usize);

    hooks.use_future(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
            frame.set((frame.get() + 1) % 4);
        }
    });

    let spinner_chars = ["◐", "◓", "◑", "◒"];
    let current_char = spinner_chars[*frame.read()];
    let color = props.color.unwrap_or(Color::Cyan);

    element! {
        Text(content: current_char, color: color)
    }
}
