use super::{CertArgs, Context, finish, health_check, report};
use clap::{Args, Subcommand};
use colored::Colorize;
use hcm_cloud::{ResourceKind, ResourceRecord, Vendor};
use hcm_cloud_tcloud::{
    CreateListenerOption, DeleteListenerOption, Protocol, UpdateListenerOption,
};
use serde_json::json;

#[derive(Subcommand)]
pub enum ListenerCommand {
    /// Create a listener and wait for it to become available
    Create(CreateArgs),
    /// Change listener settings
    Update(UpdateArgs),
    /// Delete listeners
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    region: String,
    /// Load balancer id
    #[arg(long = "lb")]
    load_balancer_id: String,
    #[arg(long)]
    name: String,
    /// TCP, UDP, TCP_SSL, HTTP, HTTPS or QUIC
    #[arg(long)]
    protocol: Protocol,
    #[arg(long)]
    port: u32,
    #[arg(long)]
    scheduler: Option<String>,
    #[arg(long)]
    session_type: Option<String>,
    /// Session persistence in seconds (0 disables)
    #[arg(long)]
    session_expire: Option<i64>,
    /// Enable SNI (HTTPS only)
    #[arg(long)]
    sni: bool,
    #[arg(long)]
    health_check: Option<bool>,
    #[command(flatten)]
    cert: CertArgs,
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
    name: Option<String>,
    #[arg(long)]
    scheduler: Option<String>,
    #[arg(long)]
    session_type: Option<String>,
    #[arg(long)]
    session_expire: Option<i64>,
    #[arg(long)]
    sni: Option<bool>,
    #[arg(long)]
    health_check: Option<bool>,
    #[command(flatten)]
    cert: CertArgs,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[arg(long)]
    region: String,
    #[arg(long = "lb")]
    load_balancer_id: String,
    /// Listener ids
    #[arg(required = true)]
    listener_ids: Vec<String>,
}

pub async fn handle(ctx: &Context, cmd: ListenerCommand) -> anyhow::Result<()> {
    match cmd {
        ListenerCommand::Create(args) => create(ctx, args).await,
        ListenerCommand::Update(args) => update(ctx, args).await,
        ListenerCommand::Delete(args) => delete(ctx, args).await,
    }
}

async fn create(ctx: &Context, args: CreateArgs) -> anyhow::Result<()> {
    let opt = CreateListenerOption {
        region: args.region,
        load_balancer_id: args.load_balancer_id,
        listener_name: args.name,
        protocol: args.protocol,
        port: args.port,
        scheduler: args.scheduler,
        session_type: args.session_type,
        session_expire_time: args.session_expire,
        sni_switch: args.sni.then_some(true),
        health_check: health_check(args.health_check),
        certificate: args.cert.into_info(),
    };
    println!(
        "{}",
        format!(
            "creating {} listener {} on port {}...",
            opt.protocol, opt.listener_name, opt.port
        )
        .yellow()
    );

    let outcome = ctx.tcloud.create_listener(&ctx.kt, &opt).await;
    let created = report("listener create", &outcome);
    let records = created
        .into_iter()
        .map(|id| {
            ResourceRecord::new(Vendor::TCloud, ResourceKind::Listener, id, &opt.region)
                .with_parent("load_balancer", &opt.load_balancer_id)
                .with_attribute("name", json!(opt.listener_name))
                .with_attribute("protocol", json!(opt.protocol))
                .with_attribute("port", json!(opt.port))
        })
        .collect();
    ctx.remember(records).await;
    finish(outcome)
}

async fn update(ctx: &Context, args: UpdateArgs) -> anyhow::Result<()> {
    let opt = UpdateListenerOption {
        region: args.region,
        load_balancer_id: args.load_balancer_id,
        listener_id: args.listener_id,
        listener_name: args.name,
        scheduler: args.scheduler,
        session_type: args.session_type,
        session_expire_time: args.session_expire,
        sni_switch: args.sni,
        health_check: health_check(args.health_check),
        certificate: args.cert.into_info(),
    };

    let outcome = ctx.tcloud.update_listener(&ctx.kt, &opt).await;
    let updated = report("listener update", &outcome);
    let records = updated
        .into_iter()
        .map(|id| {
            let mut record =
                ResourceRecord::new(Vendor::TCloud, ResourceKind::Listener, id, &opt.region)
                    .with_parent("load_balancer", &opt.load_balancer_id);
            if let Some(name) = &opt.listener_name {
                record = record.with_attribute("name", json!(name));
            }
            record
        })
        .collect();
    ctx.remember(records).await;
    finish(outcome)
}

async fn delete(ctx: &Context, args: DeleteArgs) -> anyhow::Result<()> {
    let opt = DeleteListenerOption {
        region: args.region,
        load_balancer_id: args.load_balancer_id,
        cloud_ids: args.listener_ids,
    };

    let outcome = ctx.tcloud.delete_listener(&ctx.kt, &opt).await;
    let deleted = report("listener delete", &outcome);
    ctx.forget(ResourceKind::Listener, &deleted).await;
    finish(outcome)
}
