pub mod defillama;
pub mod github;
pub mod util;

pub use defillama::DefiLlamaProvider;
pub use github::GithubProvider;
