use anyhow::{Context, Result, anyhow, bail};
use autumnus::{FormatterOption, Options, highlight, themes};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::{ArgValueCompleter, CompletionCandidate};
use futures::TryStreamExt;
use iocraft::prelude::*;
use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};
use tokio::runtime::Handle;
use url::Url;

use crate::{
    builder::{
        sizes::{CUSTOM_SIZE_ID, SideMode},
        staging::{FileHandle, Kind, Side},
        wizard::{Navigation, TemplateWizard, WizardError, WizardStep},
    },
    client::{AdminClient, ApiError, TEMPLATE_PAGE_SIZE},
    config::{Config, ConfigFile},
    logging::LogLevel,
    manifest::TemplateManifest,
    notifications::{NotificationPoller, RECENT_LIMIT},
    rest_types::{Category, NotificationQuery, Orientation, TemplateFilters, TemplateSource, Unit},
    session::{KeyringStore, Session, restore_session},
    ui::{
        ConfigHeader, ErrorMessage, FollowNotifications, InfoMessage, InputPrompt,
        NotificationsList, SizeList, SlotRow, StepHeader, SuccessMessage, TemplatesList,
        UploadSlots,
    },
};

mod builder;
mod client;
mod config;
mod logging;
mod manifest;
mod notifications;
mod rest_types;
mod serde_utils;
mod session;
mod ui;

const DEFAULT_API_BASE_URL: &str = "https://api.myprintbot.com/api/";
/// Typed at any wizard prompt to return to the previous step.
const BACK_KEYWORD: &str = ":back";

#[derive(Parser)]
#[command(name = "pbadmin")]
#[command(version)]
#[command(about = "A tool for administering the MyPrintBot platform")]
struct Cli {
    /// Log verbosity, overridden by RUST_LOG
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ListTemplatesArgs {
    #[arg(short, long, value_enum)]
    orientation: Option<Orientation>,
    #[arg(short, long, value_enum)]
    category: Option<Category>,
    /// Only templates whose name matches
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long, value_enum)]
    source: Option<TemplateSource>,
    /// Page to show, starting at 1
    #[arg(short, long, default_value_t = 1)]
    page: u32,
    /// Fetch every page
    #[arg(long, conflicts_with = "page")]
    all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure pbadmin interactively
    Config,
    /// Sign in as an administrator
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Read the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in administrator
    Whoami,
    /// List the standard card sizes
    Sizes,
    /// List templates
    Templates(ListTemplatesArgs),
    /// Create, inspect or delete a template
    #[command(subcommand)]
    Template(TemplateCommands),
    /// Show notifications
    Notifications {
        #[command(subcommand)]
        action: Option<NotificationCommands>,
        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,
        /// Keep polling until interrupted
        #[arg(short, long)]
        follow: bool,
        #[arg(short, long, default_value_t = RECENT_LIMIT)]
        limit: u32,
    },
    #[command(hide = true)]
    MarkdownHelp,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create a template, interactively or from a template.toml
    Create {
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        manifest: Option<PathBuf>,
    },
    /// Print a template as JSON
    Show {
        #[arg(add = ArgValueCompleter::new(template_id_completer))]
        id: String,
    },
    /// Delete a template
    Delete {
        #[arg(add = ArgValueCompleter::new(template_id_completer))]
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// Mark a notification as read
    Read { id: String },
    /// Mark every notification as read
    ReadAll,
    /// Delete a notification
    Delete { id: String },
}

fn main() -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _rt_guard = rt.enter();
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    let cli = Cli::parse();
    logging::init(cli.log_level)?;

    rt.block_on(async {
        match cli.command {
            Commands::Config => interactive_config(),
            Commands::Sizes => {
                element!(SizeList(selected: None)).print();
                Ok(())
            }
            Commands::MarkdownHelp => {
                clap_markdown::print_help_markdown::<Cli>();
                Ok(())
            }
            requires_api => {
                let config = config::read_config()?;
                let mut session =
                    restore_session(KeyringStore::open()?, config.token.as_deref())?;

                if let Commands::Login {
                    email,
                    password_stdin,
                } = requires_api
                {
                    let client = AdminClient::new(config.api_url, config.request_timeout, None)?;
                    return login(&client, &mut session, email, password_stdin).await;
                }

                let client = authenticated_client(&config, &session)?;
                match requires_api {
                    Commands::Logout => logout(&client, &mut session).await,
                    Commands::Whoami => whoami(&client, &mut session).await,
                    Commands::Templates(args) => list_templates(&client, args).await,
                    Commands::Template(TemplateCommands::Create { manifest }) => {
                        create_template(&client, manifest).await
                    }
                    Commands::Template(TemplateCommands::Show { id }) => {
                        show_template(&client, &id).await
                    }
                    Commands::Template(TemplateCommands::Delete { id, yes }) => {
                        delete_template(&client, &id, yes).await
                    }
                    Commands::Notifications {
                        action: Some(action),
                        ..
                    } => notification_action(&client, action).await,
                    Commands::Notifications {
                        action: None,
                        follow: true,
                        ..
                    } => follow_notifications(client, &config).await,
                    Commands::Notifications {
                        action: None,
                        follow: false,
                        unread,
                        limit,
                    } => list_notifications(&client, unread, limit).await,
                    Commands::Config
                    | Commands::Sizes
                    | Commands::MarkdownHelp
                    | Commands::Login { .. } => {
                        unreachable!("handled before the client is built")
                    }
                }
            }
        }
    })
}

fn authenticated_client(config: &Config, session: &Session<KeyringStore>) -> Result<AdminClient> {
    let token = config
        .token
        .clone()
        .or_else(|| session.token().map(str::to_owned))
        .ok_or(anyhow!("Not signed in; run `pbadmin login` first"))?;
    Ok(AdminClient::new(
        config.api_url.clone(),
        config.request_timeout,
        Some(token),
    )?)
}

/// Turns an expired or revoked token into something actionable.
fn api_failure(error: ApiError) -> anyhow::Error {
    if error.is_unauthorized() {
        anyhow!("Your session has expired; run `pbadmin login` again")
    } else {
        error.into()
    }
}

async fn login(
    client: &AdminClient,
    session: &mut Session<KeyringStore>,
    email: Option<String>,
    password_stdin: bool,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => loop {
            let email = read_input("Email", None, None)?;
            if email_address::EmailAddress::is_valid(&email) {
                break email;
            }
            element!(ErrorMessage(message: "Please enter a valid email address".to_string()))
                .print();
        },
    };
    if !email_address::EmailAddress::is_valid(&email) {
        bail!("'{email}' is not a valid email address");
    }

    let password = if password_stdin {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        read_input("Password", None, None)?
    };
    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let response = client.login(&email, &password).await.map_err(|e| {
        anyhow!(e.user_message("Login failed"))
    })?;
    let signed_in_as = response.user.email.clone();
    session.login(response.user, response.token)?;

    element!(SuccessMessage(message: format!("Signed in as {signed_in_as}"))).print();
    Ok(())
}

async fn logout(client: &AdminClient, session: &mut Session<KeyringStore>) -> Result<()> {
    if let Err(e) = client.logout().await {
        tracing::warn!(error = %e, "server side logout failed");
    }
    session.logout()?;
    element!(SuccessMessage(message: "Signed out".to_string())).print();
    Ok(())
}

async fn whoami(client: &AdminClient, session: &mut Session<KeyringStore>) -> Result<()> {
    let user = client.current_user().await.map_err(api_failure)?;
    if session.is_authenticated() {
        session.set_user(user.clone())?;
    }

    let mut details = user.email.clone();
    if let Some(name) = &user.name {
        details = format!("{name} <{details}>");
    }
    if let Some(role) = &user.role {
        details.push_str(&format!(" ({role})"));
    }
    element!(InfoMessage(message: details)).print();
    Ok(())
}

async fn list_templates(client: &AdminClient, args: ListTemplatesArgs) -> Result<()> {
    let mut filters = TemplateFilters {
        limit: TEMPLATE_PAGE_SIZE,
        offset: 0,
        orientation: args.orientation,
        category: args.category,
        search: args.search,
        source: args.source,
    };

    if args.all {
        let templates: Vec<_> = client
            .all_templates(filters)
            .try_collect()
            .await
            .map_err(api_failure)?;
        element!(TemplatesList(templates: templates, page: 0u64, total_pages: 0u64)).print();
        return Ok(());
    }

    let page = args.page.max(1);
    filters.offset = page_offset(page)?;
    let listing = client.list_templates(&filters).await.map_err(api_failure)?;
    let total_pages = listing.total_pages(TEMPLATE_PAGE_SIZE);
    if listing.items.is_empty() {
        element!(InfoMessage(message: "No templates found".to_string())).print();
        return Ok(());
    }
    element!(TemplatesList(templates: listing.items, page: u64::from(page), total_pages: total_pages))
        .print();
    Ok(())
}

fn page_offset(page: u32) -> Result<u32> {
    (page.max(1) - 1)
        .checked_mul(TEMPLATE_PAGE_SIZE)
        .ok_or(anyhow!("Page {page} is out of range"))
}

async fn show_template(client: &AdminClient, id: &str) -> Result<()> {
    let template = client.get_template(id).await.map_err(api_failure)?;
    let output = highlight(
        &serde_json::to_string_pretty(&template)?,
        Options {
            formatter: FormatterOption::Terminal {
                theme: themes::get("ayu_light").into_iter().next(),
            },
            lang_or_file: Some("json"),
        },
    );
    println!("{}", output);
    Ok(())
}

async fn delete_template(client: &AdminClient, id: &str, yes: bool) -> Result<()> {
    if !yes {
        let template = client.get_template(id).await.map_err(api_failure)?;
        let prompt = format!("Delete template '{}'?", template.record.name);
        if !confirm(&prompt, false)? {
            return Ok(());
        }
    }
    client.delete_template(id).await.map_err(api_failure)?;
    element!(SuccessMessage(message: format!("Template {id} deleted"))).print();
    Ok(())
}

async fn create_template(client: &AdminClient, manifest: Option<PathBuf>) -> Result<()> {
    let mut wizard = TemplateWizard::new(client);

    let navigation = match manifest {
        Some(path) => {
            let manifest = TemplateManifest::load(&path)?;
            run_manifest(&mut wizard, &manifest).await?
        }
        None => run_interactive(&mut wizard).await?,
    };

    let Some(record) = wizard.committed().cloned() else {
        element!(InfoMessage(message: "Template creation cancelled".to_string())).print();
        return Ok(());
    };
    let message = match wizard.created() {
        Some(template) => format!("Template saved successfully! ({})", template.id),
        None => "Template saved successfully!".to_string(),
    };
    element!(SuccessMessage(message: message)).print();

    if navigation == Navigation::TemplateList {
        let filters = TemplateFilters {
            limit: TEMPLATE_PAGE_SIZE,
            orientation: Some(record.orientation),
            ..Default::default()
        };
        let listing = client.list_templates(&filters).await.map_err(api_failure)?;
        let total_pages = listing.total_pages(TEMPLATE_PAGE_SIZE);
        element! {
            StepHeader(
                title: record.folder.clone(),
                subtitle: format!("{} template(s)", listing.count)
            )
        }
        .print();
        element!(TemplatesList(templates: listing.items, page: 1u64, total_pages: total_pages))
            .print();
    }
    Ok(())
}

fn print_wizard_error(error: &WizardError) {
    element!(ErrorMessage(message: error.to_string())).print();
    if let WizardError::InvalidDimensions(fields) = error {
        for message in [&fields.width, &fields.height].into_iter().flatten() {
            element!(ErrorMessage(message: message.clone())).print();
        }
    }
}

fn wizard_failure(error: WizardError) -> anyhow::Error {
    if let WizardError::InvalidDimensions(fields) = &error {
        let details: Vec<&str> = [&fields.width, &fields.height]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        return anyhow!("{error}: {}", details.join(", "));
    }
    error.into()
}

async fn run_manifest(
    wizard: &mut TemplateWizard<&AdminClient>,
    manifest: &TemplateManifest,
) -> Result<Navigation> {
    manifest.apply_dimensions(wizard)?;
    wizard.next().await.map_err(wizard_failure)?;

    manifest.apply_uploads(wizard)?;
    element!(InfoMessage(message: "Uploading template files...".to_string())).print();
    wizard.next().await.map_err(wizard_failure)?;

    manifest.apply_save_form(wizard)?;
    Ok(wizard.save().await?)
}

async fn run_interactive(wizard: &mut TemplateWizard<&AdminClient>) -> Result<Navigation> {
    loop {
        match wizard.step() {
            WizardStep::CollectDimensions => {
                if let StepInput::Back = collect_dimensions(wizard)? {
                    return Ok(wizard.back());
                }
                match wizard.next().await {
                    Ok(_) => {
                        element!(SuccessMessage(message: "Template dimensions configured!".to_string()))
                            .print()
                    }
                    Err(e) => print_wizard_error(&e),
                }
            }
            WizardStep::CollectUploads => {
                if let StepInput::Back = collect_uploads(wizard)? {
                    wizard.back();
                    continue;
                }
                if let Err(e) = wizard.check_uploads() {
                    print_wizard_error(&e);
                    continue;
                }
                element!(InfoMessage(message: "Uploading template files...".to_string())).print();
                match wizard.next().await {
                    Ok(_) => {
                        element!(SuccessMessage(message: "Files uploaded successfully!".to_string()))
                            .print();
                        if let Some(urls) = wizard.uploaded_urls() {
                            element!(InfoMessage(message: format!("Front preview: {}", urls.front_preview_url)))
                                .print();
                        }
                    }
                    Err(e) => print_wizard_error(&e),
                }
            }
            WizardStep::SaveModalOpen => {
                if let StepInput::Back = collect_save_form(wizard)? {
                    wizard.back();
                    continue;
                }
                element!(InfoMessage(message: "Creating template...".to_string())).print();
                match wizard.save().await {
                    Ok(navigation) => return Ok(navigation),
                    Err(e) => print_wizard_error(&e),
                }
            }
            WizardStep::Committed => return Ok(Navigation::TemplateList),
        }
    }
}

enum StepInput {
    Done,
    Back,
}

/// A wizard prompt answer; `None` when the user asked to go back.
fn wizard_prompt(prompt: &str, default: Option<&str>, description: &str) -> Result<Option<String>> {
    let description = format!("{description} (type {BACK_KEYWORD} to go back)");
    let answer = read_input(prompt, default, Some(&description))?;
    Ok((answer != BACK_KEYWORD).then_some(answer))
}

fn value_name<T: ValueEnum>(value: &T) -> Option<String> {
    value
        .to_possible_value()
        .map(|value| value.get_name().to_string())
}

fn choices<T: ValueEnum>() -> String {
    T::value_variants()
        .iter()
        .filter_map(value_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn collect_dimensions(wizard: &mut TemplateWizard<&AdminClient>) -> Result<StepInput> {
    element! {
        StepHeader(
            title: "Create Template".to_string(),
            subtitle: "Define template dimensions and orientation".to_string()
        )
    }
    .print();

    loop {
        let current = wizard.dimensions().size_id().to_string();
        element!(SizeList(selected: Some(current.clone()))).print();
        let Some(size) = wizard_prompt(
            "Card size",
            Some(&current),
            "A size from the list above, or 'custom'",
        )?
        else {
            return Ok(StepInput::Back);
        };
        match wizard.select_size(&size) {
            Ok(()) => break,
            Err(e) => print_wizard_error(&e),
        }
    }

    if wizard.dimensions().size_id() == CUSTOM_SIZE_ID {
        for field in ["Width", "Height"] {
            loop {
                let dimensions = wizard.dimensions();
                let current = match field {
                    "Width" => dimensions.width().raw().to_string(),
                    _ => dimensions.height().raw().to_string(),
                };
                let Some(raw) = wizard_prompt(field, Some(&current), "Greater than 0")? else {
                    return Ok(StepInput::Back);
                };
                let dimensions = wizard.dimensions_mut()?;
                let error = if field == "Width" {
                    dimensions.set_width(&raw);
                    dimensions.blur_width();
                    dimensions.width().error().map(str::to_owned)
                } else {
                    dimensions.set_height(&raw);
                    dimensions.blur_height();
                    dimensions.height().error().map(str::to_owned)
                };
                match error {
                    Some(message) => element!(ErrorMessage(message: message)).print(),
                    None => break,
                }
            }
        }

        loop {
            let current = value_name(&wizard.dimensions().unit());
            let Some(raw) = wizard_prompt("Unit", current.as_deref(), &choices::<Unit>())? else {
                return Ok(StepInput::Back);
            };
            match Unit::from_str(&raw, true) {
                Ok(unit) => {
                    wizard.dimensions_mut()?.set_unit(unit);
                    break;
                }
                Err(e) => element!(ErrorMessage(message: e)).print(),
            }
        }
    }

    let current = if wizard.dimensions().sides().both_sides() {
        "y"
    } else {
        "n"
    };
    let Some(both) = wizard_prompt("Print on both sides?", Some(current), "y or n")? else {
        return Ok(StepInput::Back);
    };
    let sides = if both.eq_ignore_ascii_case("n") || both.eq_ignore_ascii_case("no") {
        SideMode::Single
    } else {
        SideMode::Both
    };
    wizard.dimensions_mut()?.set_sides(sides);
    Ok(StepInput::Done)
}

fn slot_rows(wizard: &TemplateWizard<&AdminClient>, slots: &[(Side, Kind)]) -> Vec<SlotRow> {
    slots
        .iter()
        .map(|&(side, kind)| SlotRow {
            label: format!("{side} {kind}"),
            file: wizard
                .uploads()
                .get(side, kind)
                .map(|file| (file.file_name().to_string(), file.media())),
        })
        .collect()
}

fn collect_uploads(wizard: &mut TemplateWizard<&AdminClient>) -> Result<StepInput> {
    let both_sides = wizard
        .draft()
        .map(|draft| draft.both_sides)
        .unwrap_or(true);
    element! {
        StepHeader(
            title: "Upload Your Template".to_string(),
            subtitle: "Upload blank and preview files for each side (JPG, PNG or PDF)".to_string()
        )
    }
    .print();

    let mut slots = vec![(Side::Front, Kind::Blank), (Side::Front, Kind::Preview)];
    if both_sides {
        slots.extend([(Side::Back, Kind::Blank), (Side::Back, Kind::Preview)]);
    }

    for &(side, kind) in &slots {
        loop {
            let current = wizard
                .uploads()
                .get(side, kind)
                .map(|file| file.file_name().to_string());
            let description = match kind {
                Kind::Blank => "Clean card without any data; '-' clears the slot",
                Kind::Preview => "Card with dummy data filled in; '-' clears the slot",
            };
            let Some(answer) =
                wizard_prompt(&format!("{side} {kind} file"), current.as_deref(), description)?
            else {
                return Ok(StepInput::Back);
            };

            if answer == "-" {
                wizard.unstage(side, kind)?;
                break;
            }
            if answer.is_empty() || Some(&answer) == current.as_ref() {
                break;
            }

            let staged = FileHandle::from_path(&PathBuf::from(&answer))
                .and_then(|handle| Ok(wizard.stage(side, kind, handle)?));
            match staged {
                Ok(()) => break,
                Err(e) => element!(ErrorMessage(message: e.to_string())).print(),
            }
        }
    }

    element!(UploadSlots(slots: slot_rows(wizard, &slots))).print();
    Ok(StepInput::Done)
}

fn collect_save_form(wizard: &mut TemplateWizard<&AdminClient>) -> Result<StepInput> {
    element! {
        StepHeader(
            title: "Save Template".to_string(),
            subtitle: "Name the template and choose where it is filed".to_string()
        )
    }
    .print();

    let form = wizard.save_form().clone();
    let name_default = (!form.template_name.is_empty()).then_some(form.template_name.as_str());
    let Some(name) = wizard_prompt("Template name", name_default, "Shown in the template list")?
    else {
        return Ok(StepInput::Back);
    };

    let category = loop {
        let current = form.category.as_ref().and_then(value_name);
        let Some(raw) = wizard_prompt("Category", current.as_deref(), &choices::<Category>())?
        else {
            return Ok(StepInput::Back);
        };
        if raw.is_empty() {
            break None;
        }
        match Category::from_str(&raw, true) {
            Ok(category) => break Some(category),
            Err(e) => element!(ErrorMessage(message: e)).print(),
        }
    };

    let orientation = loop {
        let current = form.orientation.as_ref().and_then(value_name);
        let Some(raw) =
            wizard_prompt("Orientation", current.as_deref(), &choices::<Orientation>())?
        else {
            return Ok(StepInput::Back);
        };
        if raw.is_empty() {
            break None;
        }
        match Orientation::from_str(&raw, true) {
            Ok(orientation) => break Some(orientation),
            Err(e) => element!(ErrorMessage(message: e)).print(),
        }
    };

    let form = wizard.save_form_mut()?;
    form.template_name = name;
    form.category = category;
    form.orientation = orientation;
    Ok(StepInput::Done)
}

async fn notification_action(client: &AdminClient, action: NotificationCommands) -> Result<()> {
    let message = match action {
        NotificationCommands::Read { id } => {
            client.mark_notification_read(&id).await.map_err(api_failure)?;
            format!("Notification {id} marked as read")
        }
        NotificationCommands::ReadAll => {
            client
                .mark_all_notifications_read()
                .await
                .map_err(api_failure)?;
            "All notifications marked as read".to_string()
        }
        NotificationCommands::Delete { id } => {
            client.delete_notification(&id).await.map_err(api_failure)?;
            format!("Notification {id} deleted")
        }
    };
    element!(SuccessMessage(message: message)).print();
    Ok(())
}

async fn list_notifications(client: &AdminClient, unread_only: bool, limit: u32) -> Result<()> {
    let query = NotificationQuery {
        limit,
        unread_only,
        ..Default::default()
    };
    let (notifications, unread) = tokio::try_join!(
        client.list_notifications(query),
        client.unread_count()
    )
    .map_err(api_failure)?;
    element!(NotificationsList(notifications: notifications, unread: unread)).print();
    Ok(())
}

async fn follow_notifications(client: AdminClient, config: &Config) -> Result<()> {
    let (poller, snapshots) = NotificationPoller::spawn(Arc::new(client), config.poll_interval);
    let mut view = element!(FollowNotifications(snapshots: Some(snapshots)));

    tokio::select! {
        result = view.render_loop() => result?,
        _ = tokio::signal::ctrl_c() => {}
    }
    poller.stop().await;
    Ok(())
}

fn template_id_completer(current: &std::ffi::OsStr) -> Vec<CompletionCandidate> {
    let Some(current) = current.to_str() else {
        return vec![];
    };
    let Ok(config) = config::read_config() else {
        return vec![];
    };
    let Ok(session) = KeyringStore::open()
        .and_then(|store| restore_session(store, config.token.as_deref()))
    else {
        return vec![];
    };
    let Ok(client) = authenticated_client(&config, &session) else {
        return vec![];
    };

    let handle = Handle::current();
    let filters = TemplateFilters {
        limit: TEMPLATE_PAGE_SIZE,
        ..Default::default()
    };
    let Ok(templates) = handle.block_on(client.all_templates(filters).try_collect::<Vec<_>>())
    else {
        return vec![];
    };

    templates
        .into_iter()
        .filter(|template| template.id.starts_with(current))
        .map(|template| CompletionCandidate::new(template.id).help(Some(template.record.name.into())))
        .collect()
}

fn read_input(prompt: &str, default: Option<&str>, description: Option<&str>) -> Result<String> {
    element! {
        InputPrompt(
            prompt: prompt.to_string(),
            default: default.map(|s| s.to_string()),
            description: description.map(|s| s.to_string())
        )
    }
    .print();

    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();

    if input.is_empty() {
        if let Some(def) = default {
            Ok(def.to_string())
        } else {
            Ok(input)
        }
    } else {
        Ok(input)
    }
}

fn confirm(prompt: &str, default_yes: bool) -> Result<bool> {
    let default = if default_yes { "y" } else { "n" };
    let answer = read_input(prompt, Some(default), Some("y or n"))?;
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

fn interactive_config() -> Result<()> {
    let existing = config::read_config_file().unwrap_or_default();
    element!(ConfigHeader()).print();

    let default_url = existing
        .api_url
        .as_ref()
        .map(Url::to_string)
        .unwrap_or(DEFAULT_API_BASE_URL.to_string());
    let api_url = loop {
        let input = read_input(
            "API base URL",
            Some(&default_url),
            Some("The MyPrintBot API, including the /api/ path"),
        )?;
        match Url::parse(&input) {
            Ok(url) => break config::normalize_base_url(url),
            Err(e) => {
                element!(ErrorMessage(message: format!("Invalid URL: {}", e))).print();
            }
        }
    };

    let request_timeout = read_duration(
        "Request timeout",
        existing.request_timeout.as_deref().unwrap_or("60s"),
        "How long to wait for the server before giving up",
    )?;
    let poll_interval = read_duration(
        "Notification poll interval",
        existing.poll_interval.as_deref().unwrap_or("30s"),
        "Used by `pbadmin notifications --follow`",
    )?;

    config::write_config(ConfigFile {
        api_url: Some(api_url),
        request_timeout: Some(request_timeout),
        poll_interval: Some(poll_interval),
    })
    .context("Unable to save configuration")?;

    element!(SuccessMessage(message: "Configuration complete!".to_string())).print();
    Ok(())
}

fn read_duration(prompt: &str, default: &str, description: &str) -> Result<String> {
    loop {
        let input = read_input(prompt, Some(default), Some(description))?;
        match humantime::parse_duration(&input) {
            Ok(_) => return Ok(input),
            Err(e) => {
                element!(ErrorMessage(message: format!("Invalid duration: {}", e))).print();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1).unwrap(), 0);
        assert_eq!(page_offset(0).unwrap(), 0);
        assert_eq!(page_offset(3).unwrap(), 2 * TEMPLATE_PAGE_SIZE);
        assert!(page_offset(u32::MAX).is_err());
    }
}
