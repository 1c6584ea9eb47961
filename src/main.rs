// src/main.rs

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use agritech_admin::{
    api::ApiClient,
    common::error::AppError,
    config::ClientConfig,
    middleware::auth::RouteDecision,
    models::{
        auth::{slugify, LoginOutcome, LoginPayload, RegisterPayload},
        crm::{Customer, Vendor},
        inventory::Item,
        markets::Market,
        operations::Sale,
        settings::Theme,
        tenancy::{NewOrganizationUser, UserRole},
        wire_name, Filter, Id,
    },
    services::{
        auth::{LOGIN_FAILED, REGISTER_FAILED, VERIFY_FAILED},
        resource_list::spawn_periodic_refresh,
        sales::export_visible,
        AuthService, LineEdit, LocalOnlyStatusHandler, OrganizationUsers, RefreshMode,
        RemoteStatusHandler, Resource, ResourceListController, SaleComposer, SaleStatusHandler,
    },
    storage::{FileStore, SessionStore},
};

#[derive(Parser)]
#[command(
    name = "agritech-admin",
    about = "Painel administrativo AgriTech pela linha de comando",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Entra com e-mail e senha (use --otp se a conta tiver 2FA)
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        otp: Option<String>,
    },
    /// Cadastra uma organização nova e já entra nela
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        organization: String,
        /// Gerado a partir do nome se omitido
        #[arg(long)]
        slug: Option<String>,
    },
    Logout,
    /// Mostra a sessão atual
    Status,
    /// Diz para onde o roteador mandaria um caminho
    Route { path: String },
    #[command(subcommand)]
    Clients(ResourceCommands),
    #[command(subcommand)]
    Vendors(ResourceCommands),
    #[command(subcommand)]
    Markets(ResourceCommands),
    #[command(subcommand)]
    Items(ResourceCommands),
    #[command(subcommand)]
    Sales(SalesCommands),
    #[command(subcommand)]
    Users(UsersCommands),
    /// Lê ou altera o tema salvo
    Theme {
        #[arg(value_enum)]
        value: Option<ThemeArg>,
        #[arg(long, conflicts_with = "value")]
        toggle: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    /// Valor do filtro de status/tipo, ou ALL
    #[arg(long)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum ResourceCommands {
    List(ListArgs),
    Delete { id: String },
}

#[derive(Subcommand)]
enum SalesCommands {
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Ignora caches (botão "Atualizar")
        #[arg(long)]
        force: bool,
    },
    Delete { id: String },
    /// Exporta as vendas visíveis para CSV
    Export {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Mantém a lista atualizada em segundo plano até Ctrl+C
    Watch,
    /// Cria uma venda. Linhas no formato cultura:quantidade:preço
    New {
        #[arg(long)]
        client: String,
        #[arg(long)]
        market: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long = "line", required = true)]
        lines: Vec<String>,
        #[arg(long, conflicts_with = "reject")]
        approve: bool,
        #[arg(long)]
        reject: bool,
        /// Envia a aprovação/rejeição ao servidor
        #[arg(long)]
        remote_status: bool,
    },
}

#[derive(Subcommand)]
enum UsersCommands {
    List,
    Remove { id: String },
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum, default_value = "member")]
        role: RoleArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Member,
    Admin,
    Owner,
}

impl From<RoleArg> for UserRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Member => UserRole::Member,
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Owner => UserRole::Owner,
        }
    }
}

// Converte o erro da operação no texto que a tela mostraria
fn report(err: AppError, fallback: &str) -> anyhow::Error {
    anyhow!(err.user_message(fallback))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("Falha ao carregar a configuração")?;
    let session = SessionStore::open(FileStore::open(&config.session_file)?)?;
    let api = ApiClient::new(&config, session.clone())?;
    let auth = AuthService::new(api.clone());

    match cli.command {
        Commands::Login { email, password, otp } => {
            let outcome = auth
                .login(LoginPayload::new(email, password))
                .await
                .map_err(|e| report(e, LOGIN_FAILED))?;
            let session = match outcome {
                LoginOutcome::Authenticated(session) => session,
                LoginOutcome::TwoFactorRequired(challenge) => {
                    let Some(code) = otp else {
                        bail!(
                            "Esta conta usa verificação em duas etapas. \
                             Repita o comando com --otp <código>."
                        );
                    };
                    auth.verify_two_factor(&challenge, &code)
                        .await
                        .map_err(|e| report(e, VERIFY_FAILED))?
                }
            };
            println!("✅ Conectado como {} em {}", session.user.email, session.organization.name);
        }
        Commands::Register { email, password, organization, slug } => {
            let organization_slug = slug.unwrap_or_else(|| slugify(&organization));
            let payload = RegisterPayload {
                email,
                password,
                organization_name: organization,
                organization_slug,
            };
            let session = auth.register(payload).await.map_err(|e| report(e, REGISTER_FAILED))?;
            println!("✅ Organização {} criada", session.organization.slug);
        }
        Commands::Logout => {
            if let RouteDecision::Redirect(path) = auth.logout() {
                println!("Sessão encerrada. Próxima tela: {path}");
            }
        }
        Commands::Status => match session.current() {
            Some(current) => println!(
                "{} @ {} ({}), tema {}",
                current.user.email,
                current.organization.name,
                current.organization.id,
                session.theme().as_str()
            ),
            None => println!("Não autenticado"),
        },
        Commands::Route { path } => match auth.guard(&path) {
            RouteDecision::Allow => println!("{path}: permitido"),
            RouteDecision::Redirect(to) => println!("{path}: redireciona para {to}"),
        },
        Commands::Clients(cmd) => {
            run_resource::<Customer>(&api, cmd, |c| {
                let status = wire_name(&c.status);
                format!("{}\t{}\t{}\t{}\t{}", c.id, c.full_name(), c.email, c.phone_number, status)
            })
            .await?
        }
        Commands::Vendors(cmd) => {
            run_resource::<Vendor>(&api, cmd, |v| {
                let kind = wire_name(&v.vendor_type);
                format!("{}\t{}\t{}\t{}", v.id, v.vendor_name, v.vendor_email, kind)
            })
            .await?
        }
        Commands::Markets(cmd) => {
            run_resource::<Market>(&api, cmd, |m| {
                let availability = wire_name(&m.availability());
                format!(
                    "{}\t{}\t{}\t{}\t{}",
                    m.id, m.market_name, m.market_code, m.location, availability
                )
            })
            .await?
        }
        Commands::Items(cmd) => {
            run_resource::<Item>(&api, cmd, |i| {
                format!(
                    "{}\t{}\t{}/{}\t{}",
                    i.id,
                    i.item_name,
                    i.remaining_quantity,
                    i.quantity,
                    i.stock_status().label()
                )
            })
            .await?
        }
        Commands::Sales(cmd) => run_sales(&api, &config, cmd).await?,
        Commands::Users(cmd) => run_users(&api, cmd).await?,
        Commands::Theme { value, toggle } => {
            let theme = match (value, toggle) {
                (Some(ThemeArg::Light), _) => Some(Theme::Light),
                (Some(ThemeArg::Dark), _) => Some(Theme::Dark),
                (None, true) => Some(session.theme().toggled()),
                (None, false) => None,
            };
            if let Some(theme) = theme {
                session.set_theme(theme)?;
            }
            println!("Tema: {}", session.theme().as_str());
        }
    }

    Ok(())
}

fn apply_list_args<R: Resource>(
    controller: &mut ResourceListController<R>,
    args: &ListArgs,
) -> anyhow::Result<()> {
    if let Some(filter) = &args.filter {
        controller.set_filter(filter.parse::<Filter<R::FilterValue>>()?);
    }
    if let Some(term) = &args.search {
        controller.set_search_term(term.clone());
    }
    Ok(())
}

async fn run_resource<R: Resource>(
    api: &ApiClient,
    cmd: ResourceCommands,
    render: impl Fn(&R) -> String,
) -> anyhow::Result<()> {
    let mut controller = ResourceListController::<R>::new(api.clone());
    match cmd {
        ResourceCommands::List(args) => {
            controller.load().await.map_err(|e| report(e, R::LOAD_FAILED))?;
            apply_list_args(&mut controller, &args)?;
            let visible = controller.visible();
            for row in &visible {
                println!("{}", render(*row));
            }
            println!("{} de {} registros", visible.len(), controller.all().len());
        }
        ResourceCommands::Delete { id } => {
            controller.delete(&Id::from(id)).await.map_err(|e| report(e, R::DELETE_FAILED))?;
            println!("Registro removido");
        }
    }
    Ok(())
}

fn render_sale(sale: &Sale) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        sale.id,
        sale.client_name.as_deref().unwrap_or("N/A"),
        sale.total_amount.map(|t| format!("{t:.2}")).unwrap_or_else(|| "N/A".into()),
        wire_name(&sale.status),
        sale.sale_date.as_deref().unwrap_or("N/A"),
    )
}

async fn run_sales(
    api: &ApiClient,
    config: &ClientConfig,
    cmd: SalesCommands,
) -> anyhow::Result<()> {
    let mut controller = ResourceListController::<Sale>::new(api.clone());
    match cmd {
        SalesCommands::List { list, force } => {
            let mode = if force { RefreshMode::Force } else { RefreshMode::Normal };
            controller.refresh(mode).await.map_err(|e| report(e, Sale::LOAD_FAILED))?;
            apply_list_args(&mut controller, &list)?;
            for sale in controller.visible() {
                println!("{}", render_sale(sale));
            }
        }
        SalesCommands::Delete { id } => {
            controller.delete(&Id::from(id)).await.map_err(|e| report(e, Sale::DELETE_FAILED))?;
            println!("Venda removida");
        }
        SalesCommands::Export { list, dir } => {
            controller.load().await.map_err(|e| report(e, Sale::LOAD_FAILED))?;
            apply_list_args(&mut controller, &list)?;
            let today = chrono::Local::now().date_naive();
            let path = export_visible(&controller, &dir, today)
                .map_err(|e| report(e, "Ocorreu um erro inesperado durante a exportação."))?;
            println!("Exportado para {}", path.display());
        }
        SalesCommands::Watch => {
            controller.load().await.map_err(|e| report(e, Sale::LOAD_FAILED))?;
            println!(
                "{} vendas carregadas; atualizando a cada {:?}",
                controller.all().len(),
                config.sales_refresh_interval
            );
            let shared = Arc::new(Mutex::new(controller));
            let task = spawn_periodic_refresh(shared, config.sales_refresh_interval);
            tokio::signal::ctrl_c().await?;
            task.abort();
        }
        SalesCommands::New { client, market, notes, lines, approve, reject, remote_status } => {
            let draft = SaleDraftArgs { client, market, notes, lines, approve, reject };
            if remote_status {
                let composer = SaleComposer::with_handler(api.clone(), RemoteStatusHandler);
                compose_sale(composer, draft).await?;
            } else {
                let composer = SaleComposer::with_handler(api.clone(), LocalOnlyStatusHandler);
                compose_sale(composer, draft).await?;
            }
        }
    }
    Ok(())
}

fn parse_line(raw: &str) -> anyhow::Result<(Id, Decimal, Decimal)> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [crop, quantity, price] = parts.as_slice() else {
        bail!("Linha inválida '{raw}': use cultura:quantidade:preço");
    };
    let quantity: Decimal = quantity
        .trim()
        .parse()
        .with_context(|| format!("Quantidade inválida em '{raw}'"))?;
    let price: Decimal =
        price.trim().parse().with_context(|| format!("Preço inválido em '{raw}'"))?;
    Ok((Id::from(crop.trim()), quantity, price))
}

// Argumentos de `sales new`, já separados do handler de status
struct SaleDraftArgs {
    client: String,
    market: String,
    notes: String,
    lines: Vec<String>,
    approve: bool,
    reject: bool,
}

async fn compose_sale<H: SaleStatusHandler>(
    mut composer: SaleComposer<H>,
    draft: SaleDraftArgs,
) -> anyhow::Result<()> {
    let SaleDraftArgs { client, market, notes, lines, approve, reject } = draft;
    composer.load_lookups().await.map_err(|e| report(e, "Falha ao carregar os dados iniciais"))?;
    composer.set_client(client);
    composer.set_market(market);
    composer.set_notes(notes);

    for raw in &lines {
        let (crop, quantity, price) = parse_line(raw)?;
        composer.add_line();
        let index = composer.lines().len() - 1;
        composer.update_line(index, LineEdit::CropId(crop))?;
        composer.update_line(index, LineEdit::Quantity(quantity))?;
        composer.update_line(index, LineEdit::UnitPrice(price))?;
    }

    let sale_id = composer.submit().await.map_err(|e| report(e, "Falha ao criar a venda"))?;
    println!("✅ Venda {sale_id} criada, total {:.2}", composer.total_amount()?);

    if approve {
        composer.approve().await.map_err(|e| report(e, "Falha ao atualizar o status da venda"))?;
    } else if reject {
        composer.reject().await.map_err(|e| report(e, "Falha ao atualizar o status da venda"))?;
    }
    if let Some(message) = composer.success() {
        println!("{message}");
    }
    Ok(())
}

async fn run_users(api: &ApiClient, cmd: UsersCommands) -> anyhow::Result<()> {
    let mut users = OrganizationUsers::new(api.clone());
    match cmd {
        UsersCommands::List => {
            let members =
                users.load().await.map_err(|e| report(e, "Falha ao carregar os usuários"))?;
            for member in members {
                let email = member.email().unwrap_or("N/A");
                println!("{}\t{}\t{}", member.id, email, member.role_label());
            }
        }
        UsersCommands::Remove { id } => {
            users.remove(&Id::from(id)).await.map_err(|e| report(e, "Falha ao remover o usuário"))?;
            println!("Usuário removido da organização");
        }
        UsersCommands::Create { email, password, role } => {
            let payload = NewOrganizationUser { email, password, role: role.into() };
            let created = users
                .create_user(&payload)
                .await
                .map_err(|e| report(e, "Falha ao criar o usuário. Tente novamente."))?;
            println!("✅ Usuário {} criado", created.email);
        }
    }
    Ok(())
}
