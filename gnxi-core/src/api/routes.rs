/// Route definitions shared between the server and its clients.
///
/// The tester API is unversioned; paths match the operator UI.
pub mod prompts {
    pub const COLLECTION: &str = "/prompts";
    pub const LIST: &str = "/prompts/list";
    pub const ITEM: &str = "/prompts/{name}";
}

pub mod targets {
    pub const COLLECTION: &str = "/target";
    pub const ITEM: &str = "/target/{name}";
}

pub mod files {
    pub const UPLOAD: &str = "/file";
    pub const ITEM: &str = "/file/{file}";
}

pub mod run {
    pub const START: &str = "/run";
    pub const OUTPUT: &str = "/run/output";
}

pub mod tests {
    pub const CATALOG: &str = "/test";
    pub const ORDER: &str = "/test/order";
}

pub const HEALTH: &str = "/health";
