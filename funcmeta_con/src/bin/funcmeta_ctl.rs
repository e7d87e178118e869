// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT
use clap::Parser;
use funcmeta_api::deployment::{DeploymentSpec, UpdateOptions};
use funcmeta_api::error::ControlPlaneError;
use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::package::PackageDescriptor;

#[derive(Debug, clap::Args)]
struct PackageArgs {
    /// JSON file with the deployment spec.
    #[arg(long)]
    spec_file: Option<String>,
    /// Local package file, uploaded with the request.
    #[arg(long)]
    package_file: Option<String>,
    /// Package location: builtin://, function://, file://, http(s)://
    #[arg(long)]
    package_url: Option<String>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    Register {
        /// tenant/namespace/name
        function: String,
        #[command(flatten)]
        package: PackageArgs,
    },
    Update {
        function: String,
        #[command(flatten)]
        package: PackageArgs,
        #[arg(long, default_value_t = false)]
        update_auth_data: bool,
    },
    Deregister {
        function: String,
    },
    Get {
        function: String,
    },
    List {
        tenant: String,
        namespace: String,
    },
    Download {
        function: Option<String>,
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = false)]
        transform: bool,
        /// Standard output if not given.
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(short, long, default_value_t = String::from("funcmeta.toml"))]
    config_file: String,
    #[arg(short, long, default_value_t = String::from(""))]
    template: String,
}

fn read_conf_from_file(filename: &str) -> anyhow::Result<funcmeta_con::FuncMetaSettings> {
    if std::fs::metadata(filename).is_err() {
        anyhow::bail!("configuration file does not exist or cannot be accessed: {}", filename);
    }
    Ok(toml::from_str::<funcmeta_con::FuncMetaSettings>(&std::fs::read_to_string(filename)?)?)
}

fn parse_function(function: &str) -> anyhow::Result<FunctionIdentifier> {
    match function.split('/').collect::<Vec<&str>>().as_slice() {
        [tenant, namespace, name] => Ok(FunctionIdentifier::new(tenant, namespace, name)),
        _ => anyhow::bail!("invalid function identifier {}, expected tenant/namespace/name", function),
    }
}

fn read_package_args(args: PackageArgs) -> anyhow::Result<(Option<DeploymentSpec>, Option<PackageDescriptor>)> {
    let spec = match args.spec_file {
        Some(spec_file) => Some(serde_json::from_str::<DeploymentSpec>(&std::fs::read_to_string(spec_file)?)?),
        None => None,
    };
    let artifact = match (args.package_file, args.package_url) {
        (Some(_), Some(_)) => anyhow::bail!("--package-file and --package-url are mutually exclusive"),
        (Some(package_file), None) => {
            let declared_file_name = std::path::Path::new(&package_file)
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            Some(PackageDescriptor::UploadedStream {
                bytes: std::fs::read(&package_file)?,
                declared_file_name,
            })
        }
        (None, Some(package_url)) => Some(PackageDescriptor::from_uri(&package_url)),
        (None, None) => None,
    };
    Ok((spec, artifact))
}

fn rejected(err: ControlPlaneError) -> anyhow::Error {
    anyhow::anyhow!("request rejected ({}): {}", err.status_code(), err)
}

async fn run(command: Commands, api: &mut Box<dyn funcmeta_api::functions::FunctionsAPI>) -> anyhow::Result<()> {
    match command {
        Commands::Register { function, package } => {
            let (spec, artifact) = read_package_args(package)?;
            api.register_function(parse_function(&function)?, spec, artifact).await.map_err(rejected)?;
            println!("registered {}", function);
        }
        Commands::Update {
            function,
            package,
            update_auth_data,
        } => {
            let (spec, artifact) = read_package_args(package)?;
            api.update_function(parse_function(&function)?, spec, artifact, UpdateOptions { update_auth_data })
                .await
                .map_err(rejected)?;
            println!("updated {}", function);
        }
        Commands::Deregister { function } => {
            api.deregister_function(parse_function(&function)?).await.map_err(rejected)?;
            println!("deregistered {}", function);
        }
        Commands::Get { function } => {
            let spec = api.get_function_info(parse_function(&function)?).await.map_err(rejected)?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        Commands::List { tenant, namespace } => {
            let names = api.list_functions(&tenant, &namespace).await.map_err(rejected)?;
            println!("{}", serde_json::to_string_pretty(&names)?);
        }
        Commands::Download {
            function,
            path,
            transform,
            output,
        } => {
            let mut stream = match (function, path) {
                (None, Some(path)) => api.download_package(&path).await,
                (Some(function), None) => api.download_function_package(parse_function(&function)?, transform).await,
                _ => anyhow::bail!("exactly one of a function identifier and --path must be given"),
            }
            .map_err(rejected)?;
            let written = match output {
                Some(output) => tokio::io::copy(&mut stream, &mut tokio::fs::File::create(output).await?).await?,
                None => tokio::io::copy(&mut stream, &mut tokio::io::stdout()).await?,
            };
            log::info!("downloaded {} bytes", written);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    // Create a template configuration and exit.
    if !args.template.is_empty() {
        funcmeta_api::util::create_template(&args.template, funcmeta_con::funcmeta_default_conf().as_str())?;
        return Ok(());
    }

    let command = match args.command {
        None => {
            log::debug!("Bye");
            return Ok(());
        }
        Some(command) => command,
    };

    let settings = read_conf_from_file(&args.config_file)?;
    let (control_plane, _leader, leader_task) = funcmeta_con::funcmeta_con_build(&settings)?;
    let _leader_task = tokio::spawn(leader_task);

    let mut api = control_plane.get_functions_api();
    run(command, &mut api).await
}
