use crate::error::Result;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Response};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub struct Downloader {
    client: Client,
    quiet: bool,
}

impl Downloader {
    pub fn new(quiet: bool) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()
                .unwrap(),
            quiet,
        }
    }

    /// Issue a GET and return the response without consuming the body, so
    /// callers can inspect the status before committing to anything.
    pub async fn get(&self, url: &str) -> Result<Response> {
        Ok(self.client.get(url).send().await?)
    }

    /// Stream a response body to disk with a progress bar.
    pub async fn save_with_progress<P: AsRef<Path>>(
        &self,
        response: Response,
        dest: P,
    ) -> Result<()> {
        let total_size = response.content_length().unwrap_or(0);
        let url = response.url().to_string();

        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_size)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(format!(
            "Downloading {}",
            url.rsplit('/').next().unwrap_or("file")
        ));

        let mut file = File::create(dest.as_ref()).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().await?;

        pb.finish_and_clear();
        Ok(())
    }
}
