use super::{CertArgs, Context, finish, health_check, report};
use clap::{Args, Subcommand};
use hcm_cloud::{ResourceKind, ResourceRecord, Vendor};
use hcm_cloud_tcloud::{CreateRuleOption, DeleteRuleOption, RuleSpec, UpdateRuleOption};
use serde_json::json;

#[derive(Subcommand)]
pub enum RuleCommand {
    /// Create url rules under one domain
    Create(CreateArgs),
    /// Change a url rule
    Update(UpdateArgs),
    /// Delete url rules by location id, or one rule by domain and url
    Delete(DeleteArgs),
}

/// Listener a rule command acts on
#[derive(Args)]
pub struct ListenerRef {
    #[arg(long)]
    region: String,
    #[arg(long = "lb")]
    load_balancer_id: String,
    #[arg(long = "listener")]
    listener_id: String,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    listener: ListenerRef,
    #[arg(long)]
    domain: String,
    /// Url path (repeatable, one rule each)
    #[arg(long = "url", required = true)]
    urls: Vec<String>,
    #[arg(long)]
    scheduler: Option<String>,
    #[arg(long)]
    session_expire: Option<i64>,
    /// HTTP, HTTPS or GRPC towards the backends
    #[arg(long)]
    forward_type: Option<String>,
    #[arg(long)]
    health_check: Option<bool>,
    #[command(flatten)]
    cert: CertArgs,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    listener: ListenerRef,
    #[arg(long = "location")]
    location_id: String,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    scheduler: Option<String>,
    #[arg(long)]
    session_expire: Option<i64>,
    #[arg(long)]
    forward_type: Option<String>,
    #[arg(long)]
    health_check: Option<bool>,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    listener: ListenerRef,
    /// Location ids
    location_ids: Vec<String>,
    #[arg(long, requires = "url", conflicts_with = "location_ids")]
    domain: Option<String>,
    #[arg(long, requires = "domain")]
    url: Option<String>,
    /// Domain that becomes the default server if the deleted one was
    #[arg(long)]
    new_default_domain: Option<String>,
    /// Send one request per location id and poll them as one batch
    #[arg(long, conflicts_with = "domain")]
    each: bool,
}

pub async fn handle(ctx: &Context, cmd: RuleCommand) -> anyhow::Result<()> {
    match cmd {
        RuleCommand::Create(args) => create(ctx, args).await,
        RuleCommand::Update(args) => update(ctx, args).await,
        RuleCommand::Delete(args) => delete(ctx, args).await,
    }
}

async fn create(ctx: &Context, args: CreateArgs) -> anyhow::Result<()> {
    let certificate = args.cert.into_info();
    let rules = args
        .urls
        .into_iter()
        .map(|url| RuleSpec {
            domain: args.domain.clone(),
            url,
            scheduler: args.scheduler.clone(),
            session_expire_time: args.session_expire,
            forward_type: args.forward_type.clone(),
            health_check: health_check(args.health_check),
            certificate: certificate.clone(),
        })
        .collect();
    let opt = CreateRuleOption {
        region: args.listener.region,
        load_balancer_id: args.listener.load_balancer_id,
        listener_id: args.listener.listener_id,
        rules,
    };

    let outcome = ctx.tcloud.create_rule(&ctx.kt, &opt).await;
    let created = report("rule create", &outcome);
    let records = created
        .into_iter()
        .map(|id| {
            ResourceRecord::new(Vendor::TCloud, ResourceKind::UrlRule, id, &opt.region)
                .with_parent("load_balancer", &opt.load_balancer_id)
                .with_parent("listener", &opt.listener_id)
                .with_attribute("domain", json!(args.domain))
        })
        .collect();
    ctx.remember(records).await;
    finish(outcome)
}

async fn update(ctx: &Context, args: UpdateArgs) -> anyhow::Result<()> {
    let opt = UpdateRuleOption {
        region: args.listener.region,
        load_balancer_id: args.listener.load_balancer_id,
        listener_id: args.listener.listener_id,
        location_id: args.location_id,
        url: args.url,
        scheduler: args.scheduler,
        session_expire_time: args.session_expire,
        forward_type: args.forward_type,
        health_check: health_check(args.health_check),
    };

    let outcome = ctx.tcloud.update_rule(&ctx.kt, &opt).await;
    let updated = report("rule update", &outcome);
    let records = updated
        .into_iter()
        .map(|id| {
            ResourceRecord::new(Vendor::TCloud, ResourceKind::UrlRule, id, &opt.region)
                .with_parent("load_balancer", &opt.load_balancer_id)
                .with_parent("listener", &opt.listener_id)
        })
        .collect();
    ctx.remember(records).await;
    finish(outcome)
}

async fn delete(ctx: &Context, args: DeleteArgs) -> anyhow::Result<()> {
    let ListenerRef {
        region,
        load_balancer_id,
        listener_id,
    } = args.listener;
    let base = DeleteRuleOption {
        region,
        load_balancer_id,
        listener_id,
        new_default_server_domain: args.new_default_domain,
        ..Default::default()
    };

    let outcome = if args.each {
        let opts: Vec<DeleteRuleOption> = args
            .location_ids
            .into_iter()
            .map(|id| DeleteRuleOption {
                cloud_ids: vec![id],
                ..base.clone()
            })
            .collect();
        ctx.tcloud.batch_delete_rules(&ctx.kt, &opts).await
    } else {
        let opt = DeleteRuleOption {
            cloud_ids: args.location_ids,
            domain: args.domain,
            url: args.url,
            ..base
        };
        ctx.tcloud.delete_rule(&ctx.kt, &opt).await
    };

    let deleted = report("rule delete", &outcome);
    ctx.forget(ResourceKind::UrlRule, &deleted).await;
    finish(outcome)
}
