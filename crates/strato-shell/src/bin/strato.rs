// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Strato management CLI
//!
//! CLI tool for installing and uninstalling services and applications on a
//! strato gateway, and for inspecting deployments.
//!
//! Usage:
//!   strato <command> [options]
//!
//! Commands:
//!   install-service <app> <service>       Install a service and watch its lifecycle
//!   install-application <app>             Install an application and watch its lifecycle
//!   uninstall-service <app> <service>     Uninstall a service and watch its lifecycle
//!   uninstall-application <app>           Uninstall an application and watch its lifecycle
//!   events <deployment_id>                Print a deployment's lifecycle events
//!   describe-service <app> <service>      Print a service description
//!   describe-application <app>            Print an application description

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use strato_inspect::AdminGateway;
use strato_rest_client::{RestClient, RestClientConfig};
use strato_shell::{
    ApplicationInstaller, ApplicationUninstaller, ServiceInstaller, ServiceUninstaller,
    DEFAULT_APPLICATION_TIMEOUT_MINUTES, DEFAULT_SERVICE_TIMEOUT_MINUTES,
};

fn print_usage() {
    eprintln!(
        r#"Usage: strato <command> [options]

Manage deployments on a strato gateway.

COMMANDS:
    install-service <app> <service>         Install a service and watch its lifecycle
    install-application <app>               Install an application and watch its lifecycle
    uninstall-service <app> <service>       Uninstall a service and watch its lifecycle
    uninstall-application <app>             Uninstall an application and watch its lifecycle
    events <deployment_id>                  Print a deployment's lifecycle events
    describe-service <app> <service>        Print a service description as JSON
    describe-application <app>              Print an application description as JSON

INSTALL OPTIONS:
    --instances <n>                 Planned instances for install-service (default: 1)
    --timeout <minutes>             Initial wait budget (default: 5 for services, 15 for applications)
    --verbose                       Log polling progress
    --non-interactive               Fail on timeout instead of asking to keep waiting

EVENTS OPTIONS:
    --from <index>                  First event index to print (default: 1)

ENVIRONMENT:
    STRATO_GATEWAY_URL              Gateway base URL (default: http://127.0.0.1:8100)
    STRATO_CONNECT_TIMEOUT_MS       Connection timeout (default: 10000)
    STRATO_REQUEST_TIMEOUT_MS       Request timeout (default: 30000)
    STRATO_LOG                      Log filter, e.g. "debug" (default: warn)

EXAMPLES:
    # Install a service with two instances and a 10 minute budget
    strato install-service petclinic tomcat --instances 2 --timeout 10

    # Uninstall it without prompting on timeout
    strato uninstall-service petclinic tomcat --non-interactive

    # Follow up on a deployment's event log
    strato events dep-42 --from 17
"#
    );
}

#[derive(Debug, Clone, Copy)]
struct WaitFlags {
    timeout_minutes: Option<u64>,
    verbose: bool,
    interactive: bool,
}

impl Default for WaitFlags {
    fn default() -> Self {
        Self {
            timeout_minutes: None,
            verbose: false,
            interactive: true,
        }
    }
}

#[derive(Debug)]
enum Command {
    InstallService {
        application_name: String,
        service_name: String,
        instances: u32,
        flags: WaitFlags,
    },
    InstallApplication {
        application_name: String,
        flags: WaitFlags,
    },
    UninstallService {
        application_name: String,
        service_name: String,
        flags: WaitFlags,
    },
    UninstallApplication {
        application_name: String,
        flags: WaitFlags,
    },
    Events {
        deployment_id: String,
        from_index: u64,
    },
    DescribeService {
        application_name: String,
        service_name: String,
    },
    DescribeApplication {
        application_name: String,
    },
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from_vec(&args)
}

fn positional(args: &[String], index: usize, what: &str) -> Result<String, String> {
    args.get(index)
        .filter(|value| !value.starts_with("--"))
        .cloned()
        .ok_or_else(|| format!("{} required", what))
}

fn parse_args_from_vec(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        "install-service" => {
            let application_name = positional(args, 2, "Application name")?;
            let service_name = positional(args, 3, "Service name")?;
            let mut instances: u32 = 1;
            let mut flags = WaitFlags::default();

            let mut i = 4;
            while i < args.len() {
                match args[i].as_str() {
                    "--instances" => {
                        i += 1;
                        instances = args
                            .get(i)
                            .ok_or("--instances requires a number")?
                            .parse()
                            .map_err(|_| "Invalid instance count")?;
                    }
                    "--timeout" => {
                        i += 1;
                        flags.timeout_minutes = Some(
                            args.get(i)
                                .ok_or("--timeout requires a number")?
                                .parse()
                                .map_err(|_| "Invalid timeout")?,
                        );
                    }
                    "--verbose" => flags.verbose = true,
                    "--non-interactive" => flags.interactive = false,
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::InstallService {
                application_name,
                service_name,
                instances,
                flags,
            })
        }
        "install-application" => {
            let application_name = positional(args, 2, "Application name")?;
            let flags = parse_wait_flags(args, 3)?;
            Ok(Command::InstallApplication {
                application_name,
                flags,
            })
        }
        "uninstall-service" => {
            let application_name = positional(args, 2, "Application name")?;
            let service_name = positional(args, 3, "Service name")?;
            let flags = parse_wait_flags(args, 4)?;
            Ok(Command::UninstallService {
                application_name,
                service_name,
                flags,
            })
        }
        "uninstall-application" => {
            let application_name = positional(args, 2, "Application name")?;
            let flags = parse_wait_flags(args, 3)?;
            Ok(Command::UninstallApplication {
                application_name,
                flags,
            })
        }
        "events" => {
            let deployment_id = positional(args, 2, "Deployment ID")?;
            let mut from_index: u64 = 1;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--from" => {
                        i += 1;
                        from_index = args
                            .get(i)
                            .ok_or("--from requires an index")?
                            .parse()
                            .map_err(|_| "Invalid event index")?;
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Events {
                deployment_id,
                from_index,
            })
        }
        "describe-service" => {
            let application_name = positional(args, 2, "Application name")?;
            let service_name = positional(args, 3, "Service name")?;
            Ok(Command::DescribeService {
                application_name,
                service_name,
            })
        }
        "describe-application" => {
            let application_name = positional(args, 2, "Application name")?;
            Ok(Command::DescribeApplication { application_name })
        }
        cmd => Err(format!("Unknown command: {}", cmd)),
    }
}

fn parse_wait_flags(args: &[String], start: usize) -> Result<WaitFlags, String> {
    let mut flags = WaitFlags::default();

    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--timeout" => {
                i += 1;
                flags.timeout_minutes = Some(
                    args.get(i)
                        .ok_or("--timeout requires a number")?
                        .parse()
                        .map_err(|_| "Invalid timeout")?,
                );
            }
            "--verbose" => flags.verbose = true,
            "--non-interactive" => flags.interactive = false,
            arg => return Err(format!("Unknown argument: {}", arg)),
        }
        i += 1;
    }

    Ok(flags)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("STRATO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cmd = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let config = match RestClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match RestClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create gateway client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let gateway: Arc<dyn AdminGateway> = Arc::new(client);

    // Ctrl-C aborts a running wait as a cancellation, not a crash.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    match execute_command(gateway, cancel, cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute_command(
    gateway: Arc<dyn AdminGateway>,
    cancel: CancellationToken,
    cmd: Command,
) -> Result<(), String> {
    match cmd {
        Command::InstallService {
            application_name,
            service_name,
            instances,
            flags,
        } => {
            let installer = ServiceInstaller::new(gateway, &application_name, &service_name)
                .with_planned_instances(instances)
                .with_initial_timeout(
                    flags
                        .timeout_minutes
                        .unwrap_or(DEFAULT_SERVICE_TIMEOUT_MINUTES),
                )
                .with_verbose(flags.verbose)
                .with_interactive(flags.interactive)
                .with_cancellation(cancel);

            installer.install().await.map_err(|e| e.to_string())?;
            println!("Successfully installed service {}", service_name);
        }

        Command::InstallApplication {
            application_name,
            flags,
        } => {
            let installer = ApplicationInstaller::new(gateway, &application_name)
                .with_initial_timeout(
                    flags
                        .timeout_minutes
                        .unwrap_or(DEFAULT_APPLICATION_TIMEOUT_MINUTES),
                )
                .with_verbose(flags.verbose)
                .with_interactive(flags.interactive)
                .with_cancellation(cancel);

            installer.install().await.map_err(|e| e.to_string())?;
            println!("Successfully installed application {}", application_name);
        }

        Command::UninstallService {
            application_name,
            service_name,
            flags,
        } => {
            let uninstaller = ServiceUninstaller::new(gateway, &application_name, &service_name)
                .with_initial_timeout(
                    flags
                        .timeout_minutes
                        .unwrap_or(DEFAULT_SERVICE_TIMEOUT_MINUTES),
                )
                .with_verbose(flags.verbose)
                .with_interactive(flags.interactive)
                .with_cancellation(cancel);

            uninstaller.uninstall().await.map_err(|e| e.to_string())?;
            println!("Successfully uninstalled service {}", service_name);
        }

        Command::UninstallApplication {
            application_name,
            flags,
        } => {
            let uninstaller = ApplicationUninstaller::new(gateway, &application_name)
                .with_initial_timeout(
                    flags
                        .timeout_minutes
                        .unwrap_or(DEFAULT_APPLICATION_TIMEOUT_MINUTES),
                )
                .with_verbose(flags.verbose)
                .with_interactive(flags.interactive)
                .with_cancellation(cancel);

            uninstaller.uninstall().await.map_err(|e| e.to_string())?;
            println!(
                "Successfully uninstalled application {}",
                application_name
            );
        }

        Command::Events {
            deployment_id,
            from_index,
        } => {
            let events = gateway
                .deployment_events(&deployment_id, from_index)
                .await
                .map_err(|e| e.to_string())?;

            if events.is_empty() {
                println!("No events for deployment {}", deployment_id);
            } else {
                for event in &events.events {
                    println!("[{}] {}", event.index, event.description);
                }
            }
        }

        Command::DescribeService {
            application_name,
            service_name,
        } => {
            let description = gateway
                .service_description(&application_name, &service_name)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&description).map_err(|e| e.to_string())?
            );
        }

        Command::DescribeApplication { application_name } => {
            let description = gateway
                .application_description(&application_name)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&description).map_err(|e| e.to_string())?
            );
        }
    }

    Ok(())
}
