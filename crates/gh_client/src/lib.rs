pub mod client;

pub use client::{GithubApiError, GithubClient, RestGithubClient};
