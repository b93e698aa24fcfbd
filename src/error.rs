use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("multiplier must be one of 1, 5, 10, 25, 50, 100, 250, 500, 1000 (got {0})")]
    InvalidMultiplier(u32),
    #[error("tick rate must be > 0 (got {0}ms)")]
    InvalidTickRate(u64),
    #[error("base users must be greater than 0")]
    BaseUsersZero,
    #[error("ticks must be greater than 0")]
    TicksZero,
    #[error("jitter seed required when jitter is seeded")]
    InvalidJitterSeed,
    #[error("bottleneck catalog must not be empty")]
    EmptyCatalog,
    #[error("duplicate bottleneck id '{0}'")]
    DuplicateBottleneckId(String),
    #[error("bottleneck id must not be empty")]
    EmptyBottleneckId,
    #[error("triggers_at must be > 0 for bottleneck '{0}'")]
    InvalidTrigger(String),
    #[error("unknown command '{0}'")]
    InvalidCommand(String),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Runtime(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;
