/// Identity of the caller, resolved by upstream authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
}

impl Owner {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn owns(&self, owner_id: &str) -> bool {
        self.id == owner_id
    }
}
