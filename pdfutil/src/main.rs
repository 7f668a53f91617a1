use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use pdfengine::{
    Accuracy, Document, EncryptionMethod, EncryptionOptions, LoadOptions, OpenMode, Permissions, Result,
    SaveOptions,
};

#[derive(Parser, Debug)]
#[clap(author, version, about = "PDF utility program using the pdfengine library", arg_required_else_help = true)]
struct Args {
    /// Password for encrypted input files.
    #[clap(long, global = true)]
    password: Option<String>,

    /// Recover damaged files by scanning for objects instead of failing.
    #[clap(long, global = true)]
    lazy: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print version, page count, trailer and security information.
    Info { input: PathBuf },
    /// Append the pages of every input to the first one.
    Merge {
        #[clap(short, long)]
        output: PathBuf,
        #[clap(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
    },
    /// Write a copy without encryption.
    Decrypt {
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Write an encrypted copy using the standard security handler.
    Encrypt {
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        #[clap(long, default_value_t = String::new())]
        user_password: String,
        #[clap(long)]
        owner_password: String,
        #[clap(long, value_enum, default_value_t = Method::Aes128)]
        method: Method,
        /// Deny printing.
        #[clap(long)]
        no_print: bool,
        /// Deny copying text and graphics.
        #[clap(long)]
        no_copy: bool,
    },
    /// Collapse identical streams.
    Dedup {
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Compress streams and pack objects into object streams.
    Compress {
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        #[clap(long, default_value_t = 9)]
        level: u32,
    },
    /// Rewrite the file from scratch, dropping unreachable objects and old revisions.
    Rewrite {
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
        /// Use a cross-reference stream instead of a classic table.
        #[clap(long)]
        xref_stream: bool,
    },
}

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Method {
    Rc4_40,
    Rc4_128,
    Aes128,
}

impl From<Method> for EncryptionMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Rc4_40 => EncryptionMethod::Rc4_40,
            Method::Rc4_128 => EncryptionMethod::Rc4_128,
            Method::Aes128 => EncryptionMethod::Aes128,
        }
    }
}

impl Args {
    fn open(&self, path: &Path, mode: OpenMode) -> Result<Document> {
        let mut options = LoadOptions::builder().mode(mode);
        if self.lazy {
            options = options.accuracy(Accuracy::Lazy);
        }
        if let Some(password) = &self.password {
            options = options.password(password.clone());
        }
        info!("open {}", path.display());
        Document::open(path, options.build())
    }
}

fn save(doc: &mut Document, path: &Path, options: &SaveOptions) -> Result<()> {
    info!("save to {}", path.display());
    let mut file = std::fs::File::create(path)?;
    doc.save_with_options(&mut file, options)
}

fn print_info(doc: &mut Document) -> Result<()> {
    println!("Version: {}", doc.version);
    println!("Pages: {}", doc.page_count()?);
    println!("Objects: {}", doc.object_ids().len());
    println!("Cross-reference: {:?}", doc.reference_table.xref_type);
    match doc.encryption_state() {
        Some(state) => println!(
            "Encryption: revision {}, opened with {:?} password, permissions {:?}",
            state.handler().revision,
            state.password_kind(),
            state.permissions()
        ),
        None => println!("Encryption: none"),
    }
    let info = doc.trailer.get(b"Info").and_then(|info| info.as_reference());
    if let Ok(info) = info {
        for (key, value) in doc.get_dictionary(info)? {
            let value = value.as_text().unwrap_or_else(|_| format!("{:?}", value));
            println!("{}: {}", String::from_utf8_lossy(key), value);
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Info { input } => {
            let mut doc = args.open(input, OpenMode::ReadOnly)?;
            print_info(&mut doc)
        }
        Command::Merge { output, inputs } => {
            let mut target = args.open(&inputs[0], OpenMode::Modify)?;
            let sources = inputs[1..]
                .iter()
                .map(|input| args.open(input, OpenMode::Import))
                .collect::<Result<Vec<_>>>()?;
            let added = target.merge(sources)?;
            info!("merged {} pages", added.len());
            save(&mut target, output, &SaveOptions::default())
        }
        Command::Decrypt { input, output } => {
            let mut doc = args.open(input, OpenMode::Modify)?;
            doc.remove_encryption()?;
            save(&mut doc, output, &SaveOptions::default())
        }
        Command::Encrypt {
            input,
            output,
            user_password,
            owner_password,
            method,
            no_print,
            no_copy,
        } => {
            let mut doc = args.open(input, OpenMode::Modify)?;
            let mut permissions = Permissions::all();
            if *no_print {
                permissions.remove(Permissions::PRINTABLE | Permissions::PRINTABLE_IN_HIGH_QUALITY);
            }
            if *no_copy {
                permissions.remove(Permissions::COPYABLE);
            }
            doc.encrypt(&EncryptionOptions {
                user_password: user_password.clone(),
                owner_password: owner_password.clone(),
                permissions,
                method: (*method).into(),
                ..Default::default()
            })?;
            save(&mut doc, output, &SaveOptions::default())
        }
        Command::Dedup { input, output } => {
            let mut doc = args.open(input, OpenMode::Modify)?;
            let removed = doc.deduplicate()?;
            println!("Removed {} duplicate streams", removed);
            save(&mut doc, output, &SaveOptions::default())
        }
        Command::Compress { input, output, level } => {
            let mut doc = args.open(input, OpenMode::Modify)?;
            let options = SaveOptions::builder()
                .compress(true)
                .compression_level(*level)
                .use_object_streams(true)
                .build();
            save(&mut doc, output, &options)
        }
        Command::Rewrite {
            input,
            output,
            xref_stream,
        } => {
            let mut doc = args.open(input, OpenMode::Modify)?;
            let options = SaveOptions::builder().use_xref_streams(*xref_stream).build();
            save(&mut doc, output, &options)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
