//! LeadDesk CLI - consultation intake and project management.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use leaddesk_admin::{AdminDirectory, AdminPatch, AvailabilityFilter, NewAdmin};
use leaddesk_core::{
    Actor, AdminId, Consultation, ConsultationFilter, ConsultationStatus, MilestoneId,
    MilestoneStatus, ProjectId, ProjectStatus, RepoPermission, Role,
};
use leaddesk_dispatch::{
    CollaboratorInvite, EmailDispatcher, GithubProvisioner, HttpEmailDispatcher, NullDispatcher,
    NullProvisioner, RepoProvisioner, RepoRequest,
};
use leaddesk_lifecycle::{ConsultationDesk, NewConsultation};
use leaddesk_projects::{ProjectDesk, ProjectInput};
use leaddesk_storage::{JsonStorage, Storage};
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "leaddesk")]
#[command(about = "Consultation intake and project management", long_about = None)]
struct Cli {
    /// Storage directory
    #[arg(long, default_value = ".leaddesk")]
    data_dir: String,

    /// Acting admin id, required for privileged commands
    #[arg(long, global = true)]
    admin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the initial super admin if none exists
    Seed {
        username: String,
        email: String,
        password: String,
    },
    /// Submit a new consultation
    Submit {
        name: String,
        email: String,
        /// Project type requested
        #[arg(long = "type")]
        project_type: String,
        /// Budget band
        #[arg(long)]
        budget: String,
        /// Project description
        #[arg(long)]
        details: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        timeline: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List consultations
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a consultation
    Show { id: String },
    /// Move a consultation along the lifecycle
    Transition { id: String, status: String },
    /// Set notes and follow-up date on a consultation
    Annotate {
        id: String,
        #[arg(long)]
        notes: Option<String>,
        /// Follow-up date, RFC 3339
        #[arg(long)]
        follow_up: Option<String>,
    },
    /// Search consultations by name, email, company or phone
    Search { query: String },
    /// Aggregate consultation statistics
    Stats,
    /// Delete a consultation
    Delete { id: String },
    /// Admin directory operations
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Convert a completed consultation into a project
    Convert {
        consultation_id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Technology tags
        #[arg(long)]
        tech: Vec<String>,
    },
    /// Project operations
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Print the audit trail, oldest first
    Audit,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create an admin user
    Create {
        username: String,
        email: String,
        password: String,
        /// Role to grant
        #[arg(long, default_value = "developer")]
        role: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long, default_value = "5")]
        max_workload: u32,
    },
    /// List admin users
    List,
    /// List admins with spare capacity
    Available {
        /// Only lead-eligible roles
        #[arg(long)]
        leads: bool,
    },
    /// Update an admin's profile
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        max_workload: Option<u32>,
    },
    /// Flip an admin's active flag
    Toggle { id: String },
    /// Delete an admin user
    Delete { id: String },
    /// Verify credentials and issue a session token
    Login { username: String, password: String },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects
    List,
    /// Show a project
    Show { id: String },
    /// Move a project along the state machine
    Status { id: String, status: String },
    /// Assign the team lead
    Lead { id: String, admin_id: String },
    /// Remove the team lead
    Unlead { id: String },
    /// Add a team member
    Member {
        id: String,
        admin_id: String,
        /// Repository permission: pull, push or admin
        #[arg(long, default_value = "push")]
        permission: String,
    },
    /// Remove a team member
    Unmember { id: String, admin_id: String },
    /// Provision a repository and link it to the project
    RepoCreate {
        id: String,
        /// Repository name; defaults to a slug of the project name
        #[arg(long)]
        name: Option<String>,
        /// Create a public repository instead of a private one
        #[arg(long)]
        public: bool,
    },
    /// Unlink the repository, optionally deleting it remotely
    RepoUnlink {
        id: String,
        /// Also delete the remote repository
        #[arg(long)]
        delete_remote: bool,
    },
    /// Invite a collaborator to the linked repository
    RepoInvite {
        id: String,
        username: String,
        /// Permission to grant: pull, push or admin
        #[arg(long, default_value = "push")]
        permission: String,
    },
    /// Remove a collaborator from the linked repository
    RepoUninvite { id: String, username: String },
    /// Add a milestone
    Milestone {
        id: String,
        description: String,
        /// Due date, RFC 3339
        #[arg(long)]
        due: Option<String>,
    },
    /// Set a milestone's status: planned, in_progress or done
    MilestoneStatus {
        id: String,
        milestone_id: String,
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    let storage = Arc::new(Mutex::new(JsonStorage::new(&cli.data_dir).await?));
    let dispatcher: Arc<dyn EmailDispatcher> = match (
        std::env::var("LEADDESK_EMAIL_ENDPOINT"),
        std::env::var("LEADDESK_EMAIL_API_KEY"),
    ) {
        (Ok(endpoint), Ok(api_key)) => Arc::new(HttpEmailDispatcher::new(endpoint, api_key)),
        _ => Arc::new(NullDispatcher::succeeding()),
    };
    let provisioner: Arc<dyn RepoProvisioner> = match (
        std::env::var("LEADDESK_GITHUB_TOKEN"),
        std::env::var("LEADDESK_GITHUB_OWNER"),
    ) {
        (Ok(token), Ok(owner)) => Arc::new(GithubProvisioner::new(token, owner)),
        _ => Arc::new(NullProvisioner),
    };

    let consultations = ConsultationDesk::new(Arc::clone(&storage), dispatcher);
    let admins = AdminDirectory::new(Arc::clone(&storage));
    let projects = ProjectDesk::new(Arc::clone(&storage));

    match cli.command {
        Commands::Seed {
            username,
            email,
            password,
        } => match admins.ensure_seed(&username, &email, &password).await? {
            Some(seed) => println!("Seeded super admin: {} ({})", seed.username, seed.id),
            None => println!("Directory already seeded, nothing to do"),
        },
        Commands::Submit {
            name,
            email,
            project_type,
            budget,
            details,
            phone,
            company,
            industry,
            timeline,
            notes,
        } => {
            let consultation = consultations
                .submit(NewConsultation {
                    name,
                    email,
                    phone,
                    company,
                    industry,
                    project_type,
                    budget,
                    timeline,
                    project_details: details,
                    additional_notes: notes,
                    uploaded_files: Vec::new(),
                })
                .await?;
            // The desk fires notifications in the background; run them to
            // completion before the process exits.
            consultations.dispatch_notifications(consultation.id).await;
            println!("Submitted consultation: {}", consultation.id);
        }
        Commands::List { status } => {
            let filter = ConsultationFilter {
                status: status
                    .as_deref()
                    .map(str::parse)
                    .transpose()
                    .map_err(|e| anyhow::anyhow!("{e}"))?,
                ..Default::default()
            };
            let records = consultations.filter(&filter).await?;
            println!("Consultations ({})", records.len());
            for c in records {
                println!(
                    "  {} | {:9} | {} <{}> - {}",
                    c.id,
                    c.status.as_str(),
                    c.name,
                    c.email,
                    c.project_type,
                );
            }
        }
        Commands::Show { id } => {
            let consultation = consultations.get(parse_id(&id)?).await?;
            print_consultation(&consultation);
        }
        Commands::Transition { id, status } => {
            let status: ConsultationStatus =
                status.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let consultation = consultations
                .transition(actor(&cli.admin)?, parse_id(&id)?, status)
                .await?;
            println!("{} is now {}", consultation.id, consultation.status);
        }
        Commands::Annotate {
            id,
            notes,
            follow_up,
        } => {
            let follow_up = follow_up.as_deref().map(parse_time).transpose()?;
            consultations
                .update_notes(actor(&cli.admin)?, parse_id(&id)?, notes, follow_up)
                .await?;
            println!("Updated");
        }
        Commands::Search { query } => {
            let records = consultations.search(&query).await?;
            println!("Matches ({})", records.len());
            for c in records {
                println!(
                    "  {} | {:9} | {} <{}>",
                    c.id,
                    c.status.as_str(),
                    c.name,
                    c.email,
                );
            }
        }
        Commands::Stats => {
            let stats = consultations.stats().await?;
            println!("Consultations: {}", stats.total);
            println!("  pending:   {}", stats.pending);
            println!("  contacted: {}", stats.contacted);
            println!("  completed: {}", stats.completed);
            println!("  converted: {}", stats.converted);
            println!("  cancelled: {}", stats.cancelled);
            println!("  last 7 days:  {}", stats.last_7_days);
            println!("  last 30 days: {}", stats.last_30_days);
            for (project_type, count) in &stats.by_project_type {
                println!("  type {project_type}: {count}");
            }
            for (budget, count) in &stats.by_budget {
                println!("  budget {budget}: {count}");
            }
        }
        Commands::Delete { id } => {
            consultations
                .delete(actor(&cli.admin)?, parse_id(&id)?)
                .await?;
            println!("Deleted");
        }
        Commands::Admin { command } => {
            run_admin(&admins, &cli.admin, command).await?;
        }
        Commands::Convert {
            consultation_id,
            name,
            description,
            notes,
            tech,
        } => {
            let project = projects
                .convert(
                    required_admin(&cli.admin)?,
                    parse_id(&consultation_id)?,
                    ProjectInput {
                        name,
                        description,
                        start_date: None,
                        estimated_end_date: None,
                        technologies: tech,
                        notes,
                    },
                )
                .await?;
            println!("Created project: {} ({})", project.name, project.id);
        }
        Commands::Project { command } => {
            run_project(
                &projects,
                provisioner.as_ref(),
                required_admin(&cli.admin)?,
                command,
            )
            .await?;
        }
        Commands::Audit => {
            let events = storage.lock().await.list_audit_events().await?;
            for event in events {
                let target = event.target.as_deref().unwrap_or("-");
                println!(
                    "{} | {} | {:?} | {}",
                    event.timestamp, event.actor.0, event.action, target,
                );
            }
        }
    }

    Ok(())
}

async fn run_admin(
    admins: &AdminDirectory<JsonStorage>,
    acting: &Option<String>,
    command: AdminCommands,
) -> Result<()> {
    match command {
        AdminCommands::Create {
            username,
            email,
            password,
            role,
            display_name,
            department,
            max_workload,
        } => {
            let role: Role = role.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let created = admins
                .create(
                    required_admin(acting)?,
                    NewAdmin {
                        display_name: display_name.unwrap_or_else(|| username.clone()),
                        username,
                        password,
                        email,
                        role,
                        department,
                        skills: Vec::new(),
                        max_workload,
                    },
                )
                .await?;
            println!("Created admin: {} ({})", created.username, created.id);
        }
        AdminCommands::List => {
            let records = admins.list().await?;
            println!("Admins ({})", records.len());
            for a in records {
                println!(
                    "  {} | {:11} | {:8} | {}/{} | {}",
                    a.id,
                    a.role.as_str(),
                    if a.is_active { "active" } else { "inactive" },
                    a.workload,
                    a.max_workload,
                    a.username,
                );
            }
        }
        AdminCommands::Available { leads } => {
            let filter = if leads {
                AvailabilityFilter::LeadEligible
            } else {
                AvailabilityFilter::Any
            };
            for available in admins.list_available(filter).await? {
                println!(
                    "  {} | {:11} | {} free | {}",
                    available.admin.id,
                    available.admin.role.as_str(),
                    available.available_capacity,
                    available.admin.username,
                );
            }
        }
        AdminCommands::Update {
            id,
            email,
            display_name,
            department,
            role,
            password,
            max_workload,
        } => {
            let patch = AdminPatch {
                email,
                display_name,
                department,
                role: role
                    .as_deref()
                    .map(str::parse)
                    .transpose()
                    .map_err(|e| anyhow::anyhow!("{e}"))?,
                password,
                max_workload,
                ..Default::default()
            };
            let updated = admins
                .update(required_admin(acting)?, parse_id(&id)?, patch)
                .await?;
            println!("Updated admin: {}", updated.id);
        }
        AdminCommands::Toggle { id } => {
            let toggled = admins
                .toggle_active(required_admin(acting)?, parse_id(&id)?)
                .await?;
            println!(
                "{} is now {}",
                toggled.id,
                if toggled.is_active { "active" } else { "inactive" },
            );
        }
        AdminCommands::Delete { id } => {
            admins
                .delete(required_admin(acting)?, parse_id(&id)?)
                .await?;
            println!("Deleted");
        }
        AdminCommands::Login { username, password } => {
            let (admin, session) = admins.authenticate(&username, &password).await?;
            println!("Authenticated as {} ({})", admin.username, admin.role);
            println!("Session token: {}", session.token);
            println!("Expires: {}", session.expires_at);
        }
    }
    Ok(())
}

async fn run_project(
    projects: &ProjectDesk<JsonStorage>,
    provisioner: &dyn RepoProvisioner,
    requester: AdminId,
    command: ProjectCommands,
) -> Result<()> {
    match command {
        ProjectCommands::List => {
            let records = projects.list().await?;
            println!("Projects ({})", records.len());
            for p in records {
                println!(
                    "  {} | {:9} | {} for {}",
                    p.id,
                    p.status.as_str(),
                    p.name,
                    p.client_name,
                );
            }
        }
        ProjectCommands::Show { id } => {
            let project = projects.get(parse_id(&id)?).await?;
            println!("Project: {}", project.name);
            println!("  Id: {}", project.id);
            println!("  Status: {}", project.status);
            println!(
                "  Client: {} <{}>",
                project.client_name, project.client_email,
            );
            println!("  From consultation: {}", project.consultation_id);
            if let Some(lead) = project.team_lead {
                println!("  Team lead: {lead}");
            }
            for member in &project.team_members {
                println!(
                    "  Member: {} ({})",
                    member.admin_id,
                    member.permission.as_str(),
                );
            }
            if let Some(repo) = &project.repository {
                println!("  Repository: {} <{}>", repo.name, repo.url);
            }
            for milestone in &project.milestones {
                println!(
                    "  Milestone {} [{:?}]: {}",
                    milestone.id, milestone.status, milestone.description,
                );
            }
        }
        ProjectCommands::Status { id, status } => {
            let new_status: ProjectStatus =
                status.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let project = projects
                .update_status(requester, parse_id(&id)?, new_status)
                .await?;
            println!("{} is now {}", project.id, project.status);
        }
        ProjectCommands::Lead { id, admin_id } => {
            projects
                .assign_team_lead(requester, parse_id(&id)?, parse_id(&admin_id)?)
                .await?;
            println!("Lead assigned");
        }
        ProjectCommands::Unlead { id } => {
            projects.remove_team_lead(requester, parse_id(&id)?).await?;
            println!("Lead removed");
        }
        ProjectCommands::Member {
            id,
            admin_id,
            permission,
        } => {
            let permission: RepoPermission =
                permission.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            projects
                .assign_team_member(requester, parse_id(&id)?, parse_id(&admin_id)?, permission)
                .await?;
            println!("Member added");
        }
        ProjectCommands::Unmember { id, admin_id } => {
            projects
                .remove_team_member(requester, parse_id(&id)?, parse_id(&admin_id)?)
                .await?;
            println!("Member removed");
        }
        ProjectCommands::RepoCreate { id, name, public } => {
            let project = projects.get(parse_id(&id)?).await?;
            let repo = provisioner
                .create_repository(&RepoRequest {
                    name: name.unwrap_or_else(|| slugify(&project.name)),
                    description: project.description.clone(),
                    project_id: project.id,
                    client_name: project.client_name.clone(),
                    is_private: !public,
                })
                .await?;
            projects
                .link_repository(requester, project.id, repo.clone())
                .await?;
            println!("Linked repository: {} <{}>", repo.name, repo.url);
        }
        ProjectCommands::RepoUnlink { id, delete_remote } => {
            let project = projects.get(parse_id(&id)?).await?;
            let Some(repo) = project.repository.clone() else {
                anyhow::bail!("project has no linked repository");
            };
            if delete_remote {
                provisioner.delete_repository(&repo.name).await?;
            }
            projects.unlink_repository(requester, project.id).await?;
            println!("Unlinked repository: {}", repo.name);
        }
        ProjectCommands::RepoInvite {
            id,
            username,
            permission,
        } => {
            let project = projects.get(parse_id(&id)?).await?;
            let Some(repo) = project.repository else {
                anyhow::bail!("project has no linked repository");
            };
            let permission: RepoPermission =
                permission.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
            let results = provisioner
                .add_collaborators(
                    &repo.name,
                    &[CollaboratorInvite {
                        username,
                        permission,
                    }],
                )
                .await;
            for r in results {
                match r.error {
                    None => println!("Invited {}", r.username),
                    Some(err) => println!("Invite for {} failed: {err}", r.username),
                }
            }
        }
        ProjectCommands::RepoUninvite { id, username } => {
            let project = projects.get(parse_id(&id)?).await?;
            let Some(repo) = project.repository else {
                anyhow::bail!("project has no linked repository");
            };
            provisioner.remove_collaborator(&repo.name, &username).await?;
            println!("Removed {username}");
        }
        ProjectCommands::Milestone {
            id,
            description,
            due,
        } => {
            let due = due.as_deref().map(parse_time).transpose()?;
            let milestone = projects
                .add_milestone(requester, parse_id(&id)?, description, due)
                .await?;
            println!("Added milestone: {}", milestone.id);
        }
        ProjectCommands::MilestoneStatus {
            id,
            milestone_id,
            status,
        } => {
            let status = parse_milestone_status(&status)?;
            let project_id: ProjectId = parse_id(&id)?;
            let milestone_id: MilestoneId = parse_id(&milestone_id)?;
            let milestone = projects
                .set_milestone_status(requester, project_id, milestone_id, status)
                .await?;
            println!("Milestone {} is now {:?}", milestone.id, milestone.status);
        }
    }
    Ok(())
}

fn print_consultation(c: &Consultation) {
    println!("Consultation: {}", c.id);
    println!("  Name: {}", c.name);
    println!("  Email: {}", c.email);
    if let Some(phone) = &c.phone {
        println!("  Phone: {phone}");
    }
    if let Some(company) = &c.company {
        println!("  Company: {company}");
    }
    println!("  Type: {}", c.project_type);
    println!("  Budget: {}", c.budget);
    println!("  Status: {}", c.status);
    println!("  Submitted: {}", c.submitted_at);
    println!("  Details: {}", c.project_details);
    if let Some(notes) = &c.notes {
        println!("  Notes: {notes}");
    }
    if let Some(follow_up) = c.follow_up {
        println!("  Follow up: {follow_up}");
    }
    if c.status == ConsultationStatus::Converted {
        if let Some(project_id) = c.project_id {
            println!("  Project: {project_id}");
        }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn parse_id<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse().map_err(|_| anyhow::anyhow!("invalid id: {s}"))
}

fn required_admin(admin: &Option<String>) -> Result<AdminId> {
    parse_id(
        admin
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--admin is required"))?,
    )
}

fn actor(admin: &Option<String>) -> Result<Actor> {
    Ok(match admin.as_deref() {
        Some(s) => Actor::admin(parse_id(s)?),
        None => Actor::system(),
    })
}

fn parse_time(s: &str) -> Result<leaddesk_core::Time> {
    Ok(chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("invalid timestamp: {e}"))?
        .with_timezone(&chrono::Utc))
}

fn parse_milestone_status(s: &str) -> Result<MilestoneStatus> {
    match s.to_lowercase().as_str() {
        "planned" => Ok(MilestoneStatus::Planned),
        "in_progress" | "in-progress" => Ok(MilestoneStatus::InProgress),
        "done" => Ok(MilestoneStatus::Done),
        _ => Err(anyhow::anyhow!("unknown milestone status: {s}")),
    }
}
