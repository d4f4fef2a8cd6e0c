//! Serenity event handler wiring Discord interactions to the core components.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use quill_session::{IssueKind, IssueSession, SessionManager};
use quill_store::{NewRegistration, Registration, RegistryStore};
use quill_tracker::{NewIssue, TrackerClient};
use serenity::all::{
    ActionRow, ActionRowComponent, ButtonStyle, Command, CommandInteraction, CommandType,
    ComponentInteraction, ComponentInteractionDataKind, Context, CreateActionRow, CreateButton,
    CreateCommand, CreateInputText, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateModal, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, EventHandler, InputTextStyle, InstallationContext, Interaction,
    InteractionContext, ModalInteraction, Ready, ResolvedTarget,
};
use serenity::async_trait;
use tracing::{error, info, warn};

mod custom_ids;
mod render_helpers;
#[cfg(test)]
mod tests;

use custom_ids::CustomId;
use render_helpers::{
    parse_repo_url, render_issue_body, render_repo_count, render_repo_line, step_prompt,
    verify_failure_reason,
};

/// Slash command listing and managing a user's registrations.
pub const CMD_MANAGE: &str = "repos";
/// Message command starting the bug-report wizard.
pub const CMD_CREATE_BUG: &str = "Create bug report";
/// Message command starting the feature-request wizard.
pub const CMD_CREATE_FEATURE: &str = "Create feature request";

/// Discord caps string selects at 25 options.
const SELECT_MENU_OPTION_CAP: usize = 25;

const MODAL_INPUT_URL: &str = "url";
const MODAL_INPUT_TOKEN: &str = "token";
const MODAL_INPUT_TITLE: &str = "title";

/// Gateway event handler holding the bot's stateful components.
pub struct DiscordHandler {
    store: Arc<RegistryStore>,
    sessions: SessionManager,
    tracker: TrackerClient,
    reset_commands: bool,
}

impl DiscordHandler {
    pub fn new(
        store: Arc<RegistryStore>,
        sessions: SessionManager,
        tracker: TrackerClient,
        reset_commands: bool,
    ) -> Self {
        Self {
            store,
            sessions,
            tracker,
            reset_commands,
        }
    }

    fn command_definitions() -> Vec<CreateCommand> {
        let everywhere = vec![
            InteractionContext::Guild,
            InteractionContext::BotDm,
            InteractionContext::PrivateChannel,
        ];
        vec![
            CreateCommand::new(CMD_MANAGE)
                .description("Manage issue-tracker repositories")
                .integration_types(vec![InstallationContext::User])
                .contexts(everywhere.clone()),
            CreateCommand::new(CMD_CREATE_BUG)
                .kind(CommandType::Message)
                .integration_types(vec![InstallationContext::User])
                .contexts(everywhere.clone()),
            CreateCommand::new(CMD_CREATE_FEATURE)
                .kind(CommandType::Message)
                .integration_types(vec![InstallationContext::User])
                .contexts(everywhere),
        ]
    }

    /// Registers the application commands, recreating them when requested.
    async fn sync_commands(&self, ctx: &Context) -> Result<()> {
        let existing = Command::get_global_commands(&ctx.http)
            .await
            .context("failed to list global commands")?;
        let has_commands = !existing.is_empty();
        if has_commands && self.reset_commands {
            for command in &existing {
                Command::delete_global_command(&ctx.http, command.id)
                    .await
                    .with_context(|| format!("failed to delete command {}", command.name))?;
                info!(command = %command.name, "deleted application command");
            }
        }
        if !has_commands || self.reset_commands {
            for definition in Self::command_definitions() {
                let created = Command::create_global_command(&ctx.http, definition)
                    .await
                    .context("failed to create application command")?;
                info!(command = %created.name, "created application command");
            }
        }
        Ok(())
    }

    async fn handle_command(&self, ctx: &Context, command: &CommandInteraction) -> Result<()> {
        match command.data.name.as_str() {
            CMD_CREATE_BUG => self.start_issue_wizard(ctx, command, IssueKind::Bug).await,
            CMD_CREATE_FEATURE => {
                self.start_issue_wizard(ctx, command, IssueKind::Feature)
                    .await
            }
            CMD_MANAGE => self.show_repo_overview(ctx, command).await,
            other => bail!("unhandled application command: {other}"),
        }
    }

    /// Step 1 of the wizard: remember the target message in a fresh session
    /// and prompt for the repository.
    async fn start_issue_wizard(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        kind: IssueKind,
    ) -> Result<()> {
        let Some(ResolvedTarget::Message(message)) = command.data.target() else {
            bail!("message command without resolved target message");
        };
        let user_id = command.user.id.to_string();
        let repos = self.store.list_for_user(&user_id)?;
        if repos.is_empty() {
            return respond_ephemeral(
                ctx,
                command,
                ":exclamation: Please add a repository first (use /repos).",
            )
            .await;
        }

        let session = IssueSession {
            requester_id: user_id,
            guild_id: command
                .guild_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            channel_id: command.channel_id.to_string(),
            message_id: message.id.to_string(),
            author_id: message.author.id.to_string(),
            author_name: message.author.name.to_string(),
            message_content: message.content.to_string(),
            message_timestamp: message.timestamp.to_string(),
            kind,
            registration_id: None,
            title: None,
        };
        let token = self.sessions.create(session);

        let options: Vec<CreateSelectMenuOption> = repos
            .iter()
            .take(SELECT_MENU_OPTION_CAP)
            .map(|repo| CreateSelectMenuOption::new(repo.short_name(), repo.id.to_string()))
            .collect();
        let select = CreateSelectMenu::new(
            CustomId::IssueRepoSelect { token }.encode(),
            CreateSelectMenuKind::String { options },
        )
        .placeholder("Choose repo");

        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(step_prompt(kind, 1))
                        .ephemeral(true)
                        .components(vec![CreateActionRow::SelectMenu(select)]),
                ),
            )
            .await
            .context("failed to send repo selection prompt")?;
        Ok(())
    }

    /// `/repos`: deferred listing of the user's registrations with per-repo
    /// Delete/Test buttons and a trailing "Add repository" button.
    async fn show_repo_overview(&self, ctx: &Context, command: &CommandInteraction) -> Result<()> {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(
                    CreateInteractionResponseMessage::new().ephemeral(true),
                ),
            )
            .await
            .context("failed to defer repo overview")?;

        let repos = self.store.list_for_user(&command.user.id.to_string())?;
        command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(render_repo_count(repos.len()))
                    .ephemeral(true),
            )
            .await
            .context("failed to send repo count")?;

        for repo in &repos {
            let buttons = vec![
                CreateButton::new(CustomId::RepoDelete { id: repo.id }.encode())
                    .label("Delete")
                    .style(ButtonStyle::Danger),
                CreateButton::new(CustomId::RepoTest { id: repo.id }.encode()).label("Test"),
            ];
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(render_repo_line(repo))
                        .ephemeral(true)
                        .components(vec![CreateActionRow::Buttons(buttons)]),
                )
                .await
                .context("failed to send repo entry")?;
        }

        let add_button = CreateButton::new(CustomId::RepoAddOpen.encode()).label("Add repository");
        command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .ephemeral(true)
                    .components(vec![CreateActionRow::Buttons(vec![add_button])]),
            )
            .await
            .context("failed to send add-repository button")?;
        Ok(())
    }

    async fn handle_component(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
    ) -> Result<()> {
        let custom_id = CustomId::decode(&component.data.custom_id)
            .ok_or_else(|| anyhow!("unhandled component custom id: {}", component.data.custom_id))?;
        match custom_id {
            CustomId::RepoAddOpen => self.open_repo_add_modal(ctx, component).await,
            CustomId::IssueRepoSelect { token } => {
                self.advance_wizard_to_title(ctx, component, &token).await
            }
            CustomId::RepoDelete { id } => self.delete_repo(ctx, component, id).await,
            CustomId::RepoTest { id } => self.test_repo(ctx, component, id).await,
            CustomId::RepoAdd { .. } | CustomId::IssueSubmit { .. } => {
                bail!("modal custom id delivered as component: {}", component.data.custom_id)
            }
        }
    }

    async fn open_repo_add_modal(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
    ) -> Result<()> {
        let modal = CreateModal::new(
            CustomId::RepoAdd {
                user_id: component.user.id.to_string(),
            }
            .encode(),
            "Add repo",
        )
        .components(vec![
            CreateActionRow::InputText(
                CreateInputText::new(InputTextStyle::Short, "Repository URL", MODAL_INPUT_URL)
                    .placeholder("https://github.com/{OWNER}/{REPO}")
                    .required(true),
            ),
            CreateActionRow::InputText(
                CreateInputText::new(InputTextStyle::Short, "Token", MODAL_INPUT_TOKEN)
                    .placeholder("Needs issues read & write access")
                    .required(true),
            ),
        ]);
        component
            .create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
            .await
            .context("failed to open add-repo modal")?;
        Ok(())
    }

    /// Step 2: repo chosen. Record it on the session and ask for the title.
    async fn advance_wizard_to_title(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        token: &str,
    ) -> Result<()> {
        let mut session = match self.sessions.load(token) {
            Ok(session) => session,
            Err(error) => {
                warn!(%error, "wizard step for unknown session");
                return respond_component_ephemeral(
                    ctx,
                    component,
                    ":x: This dialog has expired. Please start again.",
                )
                .await;
            }
        };
        if session.requester_id != component.user.id.to_string() {
            warn!(token, "wizard advanced by a different user; ignoring");
            return respond_component_ephemeral(
                ctx,
                component,
                ":x: This dialog belongs to another user.",
            )
            .await;
        }

        let ComponentInteractionDataKind::StringSelect { values } = &component.data.kind else {
            bail!("repo selection delivered without select values");
        };
        let selected = values
            .first()
            .ok_or_else(|| anyhow!("repo selection with empty values"))?;
        let registration_id: u64 = selected
            .parse()
            .with_context(|| format!("malformed registration id '{selected}'"))?;
        session.registration_id = Some(registration_id);
        let kind = session.kind;
        self.sessions.store(token, session);

        let modal = CreateModal::new(
            CustomId::IssueSubmit {
                token: token.to_string(),
            }
            .encode(),
            step_prompt(kind, 2),
        )
        .components(vec![CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, "Title", MODAL_INPUT_TITLE).required(true),
        )]);
        component
            .create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
            .await
            .context("failed to open title modal")?;
        Ok(())
    }

    async fn delete_repo(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        id: u64,
    ) -> Result<()> {
        self.store.delete(id)?;
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content(":white_check_mark: Repo deleted")
                        .components(Vec::new()),
                ),
            )
            .await
            .context("failed to confirm repo deletion")?;
        Ok(())
    }

    async fn test_repo(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        id: u64,
    ) -> Result<()> {
        let registration = self.store.get(id)?;
        let outcome = match self.tracker.verify_credential(&registration).await {
            Ok(()) => format!(
                ":white_check_mark: {}: Test succeeded",
                registration.short_name()
            ),
            Err(error) => {
                warn!(%error, id, "credential test failed");
                format!(
                    ":x: {}: Test failed: {}",
                    registration.short_name(),
                    verify_failure_reason(&error)
                )
            }
        };
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new().content(outcome),
                ),
            )
            .await
            .context("failed to report credential test")?;
        Ok(())
    }

    async fn handle_modal(&self, ctx: &Context, modal: &ModalInteraction) -> Result<()> {
        let custom_id = CustomId::decode(&modal.data.custom_id)
            .ok_or_else(|| anyhow!("unhandled modal custom id: {}", modal.data.custom_id))?;
        match custom_id {
            CustomId::IssueSubmit { token } => self.submit_issue(ctx, modal, &token).await,
            CustomId::RepoAdd { user_id } => self.add_repo(ctx, modal, &user_id).await,
            other => bail!("component custom id delivered as modal: {other:?}"),
        }
    }

    /// Final wizard step: read the title, create the remote issue, consume
    /// the session.
    async fn submit_issue(&self, ctx: &Context, modal: &ModalInteraction, token: &str) -> Result<()> {
        let mut session = match self.sessions.load(token) {
            Ok(session) => session,
            Err(error) => {
                warn!(%error, "issue submitted for unknown session");
                return respond_modal_ephemeral(
                    ctx,
                    modal,
                    ":x: This dialog has expired. Please start again.",
                )
                .await;
            }
        };
        if session.requester_id != modal.user.id.to_string() {
            warn!(token, "issue submitted by a different user; ignoring");
            return respond_modal_ephemeral(ctx, modal, ":x: This dialog belongs to another user.")
                .await;
        }

        let title = modal_input(&modal.data.components, MODAL_INPUT_TITLE)
            .ok_or_else(|| anyhow!("title modal without title input"))?;
        session.title = Some(title.clone());
        self.sessions.store(token, session.clone());

        let registration_id = session
            .registration_id
            .ok_or_else(|| anyhow!("issue submitted before repo selection"))?;
        let registration = self.store.get(registration_id)?;
        let issue = NewIssue {
            title,
            body: render_issue_body(&session),
            labels: session.kind.label().map(str::to_string).into_iter().collect(),
        };
        let issue_url = self.tracker.create_issue(&registration, &issue).await?;
        info!(
            repo = %registration.short_name(),
            url = %issue_url,
            "issue created"
        );

        modal
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content(format!(
                            ":white_check_mark: Issue created on {}\n{issue_url}",
                            registration.vendor.host()
                        ))
                        .components(Vec::new()),
                ),
            )
            .await
            .context("failed to confirm issue creation")?;
        self.sessions.delete(token);
        Ok(())
    }

    /// Repo add modal submitted: parse the URL, verify the token against the
    /// vendor, then create or update the registration.
    async fn add_repo(&self, ctx: &Context, modal: &ModalInteraction, user_id: &str) -> Result<()> {
        modal
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(
                    CreateInteractionResponseMessage::new().ephemeral(true),
                ),
            )
            .await
            .context("failed to defer repo add")?;

        let raw_url = modal_input(&modal.data.components, MODAL_INPUT_URL)
            .ok_or_else(|| anyhow!("add-repo modal without url input"))?;
        let token = modal_input(&modal.data.components, MODAL_INPUT_TOKEN)
            .ok_or_else(|| anyhow!("add-repo modal without token input"))?;

        let (owner, repo, vendor) = match parse_repo_url(&raw_url) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(url = %raw_url, %error, "rejected repository url");
                return followup_modal(ctx, modal, format!(":x: Failed to add repo: {error}"))
                    .await;
            }
        };

        let candidate = Registration {
            id: 0,
            user_id: user_id.to_string(),
            vendor,
            owner: owner.clone(),
            repo: repo.clone(),
            token: token.clone(),
        };
        if let Err(error) = self.tracker.verify_credential(&candidate).await {
            warn!(%error, repo = %candidate.short_name(), "credential check failed");
            return followup_modal(
                ctx,
                modal,
                format!(":x: Failed to add repo: {}", verify_failure_reason(&error)),
            )
            .await;
        }

        let (registration, created) = self.store.create_or_update(NewRegistration {
            user_id: user_id.to_string(),
            vendor,
            owner,
            repo,
            token,
        })?;
        let action = if created { "added" } else { "updated" };
        followup_modal(
            ctx,
            modal,
            format!(
                ":white_check_mark: Repo {action}: {}",
                registration.short_name()
            ),
        )
        .await
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "bot is up");
        if let Err(error) = self.sync_commands(&ctx).await {
            error!(%error, "failed to sync application commands");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let outcome = match &interaction {
            Interaction::Command(command) => self.handle_command(&ctx, command).await,
            Interaction::Component(component) => self.handle_component(&ctx, component).await,
            Interaction::Modal(modal) => self.handle_modal(&ctx, modal).await,
            _ => Ok(()),
        };
        if let Err(error) = outcome {
            error!(%error, "interaction failed");
        }
    }
}

/// Finds a text input's non-blank value across the modal's action rows.
fn modal_input(rows: &[ActionRow], custom_id: &str) -> Option<String> {
    for row in rows {
        for component in &row.components {
            if let ActionRowComponent::InputText(input) = component {
                if input.custom_id == custom_id {
                    return input
                        .value
                        .clone()
                        .filter(|value| !value.trim().is_empty());
                }
            }
        }
    }
    None
}

async fn respond_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    content: impl Into<String>,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
        .context("failed to send ephemeral response")?;
    Ok(())
}

async fn respond_component_ephemeral(
    ctx: &Context,
    component: &ComponentInteraction,
    content: impl Into<String>,
) -> Result<()> {
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
        .context("failed to send ephemeral response")?;
    Ok(())
}

async fn respond_modal_ephemeral(
    ctx: &Context,
    modal: &ModalInteraction,
    content: impl Into<String>,
) -> Result<()> {
    modal
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
        .context("failed to send ephemeral response")?;
    Ok(())
}

async fn followup_modal(
    ctx: &Context,
    modal: &ModalInteraction,
    content: impl Into<String>,
) -> Result<()> {
    modal
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await
        .context("failed to send followup")?;
    Ok(())
}
