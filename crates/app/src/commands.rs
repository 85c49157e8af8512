//! CLI commands

use std::path::PathBuf;

use clap::Subcommand;
use photox_application::{
    AlbumService, ApiClient, AuthService, ImageService, ImageUpload, ListQuery,
};
use serde_json::{Map, Value, json};
use tracing::info;

/// Error type for command execution.
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account name
        username: String,
        /// Account password
        #[arg(long, env = "PHOTOX_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Create an account
    Register {
        /// Account name
        username: String,
        /// Account password
        #[arg(long, env = "PHOTOX_PASSWORD", hide_env_values = true)]
        password: String,
        /// Contact email
        #[arg(long)]
        email: Option<String>,
    },

    /// Album operations
    Albums {
        #[command(subcommand)]
        command: AlbumCommands,
    },

    /// Image operations
    Images {
        #[command(subcommand)]
        command: ImageCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum AlbumCommands {
    /// List your albums
    List {
        /// Page number
        #[arg(long)]
        page: Option<u32>,
        /// Page size
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Show an album and its images
    Get {
        /// Album ID
        id: u64,
    },

    /// Create an album
    Create {
        /// Album title
        title: String,
        /// Album description
        #[arg(long)]
        description: Option<String>,
        /// Make the album public
        #[arg(long)]
        public: bool,
    },

    /// Edit an album
    Update {
        /// Album ID
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Public visibility
        #[arg(long)]
        public: Option<bool>,
    },

    /// Delete an album
    Delete {
        /// Album ID
        id: u64,
    },

    /// Add an image to an album
    AddImage {
        /// Album ID
        album_id: u64,
        /// Image ID
        image_id: u64,
    },

    /// Remove an image from an album
    RemoveImage {
        /// Album ID
        album_id: u64,
        /// Image ID
        image_id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImageCommands {
    /// List your images
    List {
        /// Page number
        #[arg(long, conflicts_with = "next")]
        page: Option<u32>,
        /// Page size
        #[arg(long)]
        page_size: Option<u32>,
        /// Ordering, e.g. `-created_at`
        #[arg(long)]
        ordering: Option<String>,
        /// `next` link from a previous page
        #[arg(long)]
        next: Option<String>,
    },

    /// Show an image
    Get {
        /// Image ID
        id: u64,
    },

    /// Edit an image
    Update {
        /// Image ID
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// Public visibility
        #[arg(long)]
        public: Option<bool>,
    },

    /// Delete an image
    Delete {
        /// Image ID
        id: u64,
    },

    /// Upload an image file
    Upload {
        /// File to upload
        file: PathBuf,
        /// Image title
        #[arg(long)]
        title: Option<String>,
        /// Image category
        #[arg(long)]
        category: Option<String>,
        /// Public visibility
        #[arg(long)]
        public: Option<bool>,
    },
}

/// Builds a JSON object from the fields that were given.
fn payload(fields: [(&str, Option<Value>); 3]) -> Value {
    let map: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect();
    Value::Object(map)
}

fn print(value: &Value) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Commands {
    /// Runs the command against `client`.
    pub async fn execute(self, client: ApiClient) -> Result<(), CommandError> {
        match self {
            Self::Login { username, password } => {
                client.login(&username, &password).await?;
                println!("Logged in as {username}");
            }
            Self::Logout => {
                client.logout().await?;
                println!("Logged out");
            }
            Self::Whoami => match AuthService::new(client).initialize().await? {
                Some(user) => print(&user)?,
                None => println!("Not logged in"),
            },
            Self::Refresh => {
                client.refresh().await?;
                println!("Access token refreshed");
            }
            Self::Register {
                username,
                password,
                email,
            } => {
                let mut body = json!({"username": username, "password": password});
                if let Some(email) = email {
                    body["email"] = Value::String(email);
                }
                print(&AuthService::new(client).register(body).await?)?;
            }
            Self::Albums { command } => command.execute(AlbumService::new(client)).await?,
            Self::Images { command } => command.execute(ImageService::new(client)).await?,
        }
        Ok(())
    }
}

impl AlbumCommands {
    async fn execute(self, albums: AlbumService) -> Result<(), CommandError> {
        let result = match self {
            Self::List { page, page_size } => {
                let query = ListQuery {
                    page,
                    page_size,
                    ordering: None,
                };
                albums.list(&query).await?
            }
            Self::Get { id } => albums.get(id).await?,
            Self::Create {
                title,
                description,
                public,
            } => {
                albums
                    .create(payload([
                        ("title", Some(Value::String(title))),
                        ("description", description.map(Value::String)),
                        ("is_public", Some(Value::Bool(public))),
                    ]))
                    .await?
            }
            Self::Update {
                id,
                title,
                description,
                public,
            } => {
                albums
                    .update(
                        id,
                        payload([
                            ("title", title.map(Value::String)),
                            ("description", description.map(Value::String)),
                            ("is_public", public.map(Value::Bool)),
                        ]),
                    )
                    .await?
            }
            Self::Delete { id } => {
                albums.delete(id).await?;
                info!(id, "album deleted");
                return Ok(());
            }
            Self::AddImage { album_id, image_id } => albums.add_image(album_id, image_id).await?,
            Self::RemoveImage { album_id, image_id } => {
                albums.remove_image(album_id, image_id).await?
            }
        };
        print(&result)
    }
}

impl ImageCommands {
    async fn execute(self, images: ImageService) -> Result<(), CommandError> {
        let result = match self {
            Self::List {
                next: Some(next), ..
            } => images.list_next(&next).await?,
            Self::List {
                page,
                page_size,
                ordering,
                next: None,
            } => {
                let query = ListQuery {
                    page,
                    page_size,
                    ordering,
                };
                images.list(&query).await?
            }
            Self::Get { id } => images.get(id).await?,
            Self::Update {
                id,
                title,
                category,
                public,
            } => {
                images
                    .update(
                        id,
                        payload([
                            ("title", title.map(Value::String)),
                            ("category", category.map(Value::String)),
                            ("is_public", public.map(Value::Bool)),
                        ]),
                    )
                    .await?
            }
            Self::Delete { id } => {
                images.delete(id).await?;
                info!(id, "image deleted");
                return Ok(());
            }
            Self::Upload {
                file,
                title,
                category,
                public,
            } => {
                let bytes = tokio::fs::read(&file).await?;
                let file_name = file
                    .file_name()
                    .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

                let mut upload = ImageUpload::new(file_name, bytes);
                if let Some(title) = title {
                    upload = upload.title(title);
                }
                if let Some(category) = category {
                    upload = upload.category(category);
                }
                if let Some(public) = public {
                    upload = upload.is_public(public);
                }
                images.upload(upload).await?
            }
        };
        print(&result)
    }
}
