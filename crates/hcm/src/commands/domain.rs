use super::{CertArgs, Context, finish, report};
use clap::{Args, Subcommand};
use hcm_cloud::{ResourceKind, ResourceRecord, Vendor};
use hcm_cloud_tcloud::UpdateDomainAttrOption;

#[derive(Subcommand)]
pub enum DomainCommand {
    /// Rename a domain, move the default server or replace its certificate
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    region: String,
    #[arg(long = "lb")]
    load_balancer_id: String,
    #[arg(long = "listener")]
    listener_id: String,
    #[arg(long)]
    domain: String,
    #[arg(long)]
    new_domain: Option<String>,
    /// Make this domain the listener's default server (or stop being it)
    #[arg(long)]
    default_server: Option<bool>,
    /// Required with --default-server false
    #[arg(long)]
    new_default_domain: Option<String>,
    #[command(flatten)]
    cert: CertArgs,
}

pub async fn handle(ctx: &Context, cmd: DomainCommand) -> anyhow::Result<()> {
    match cmd {
        DomainCommand::Update(args) => update(ctx, args).await,
    }
}

async fn update(ctx: &Context, args: UpdateArgs) -> anyhow::Result<()> {
    let opt = UpdateDomainAttrOption {
        region: args.region,
        load_balancer_id: args.load_balancer_id,
        listener_id: args.listener_id,
        domain: args.domain,
        new_domain: args.new_domain,
        default_server: args.default_server,
        new_default_server_domain: args.new_default_domain,
        certificate: args.cert.into_info(),
    };

    let outcome = ctx.tcloud.update_domain_attr(&ctx.kt, &opt).await;
    let updated = report("domain update", &outcome);
    if opt.new_domain.is_some() {
        ctx.forget(ResourceKind::DomainAttribute, std::slice::from_ref(&opt.domain))
            .await;
    }
    let records = updated
        .into_iter()
        .map(|id| {
            ResourceRecord::new(Vendor::TCloud, ResourceKind::DomainAttribute, id, &opt.region)
                .with_parent("load_balancer", &opt.load_balancer_id)
                .with_parent("listener", &opt.listener_id)
        })
        .collect();
    ctx.remember(records).await;
    finish(outcome)
}
