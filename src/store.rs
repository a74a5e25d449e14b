use crate::config::DatasetLayout;
use crate::domain::{Location, ScreenId};

#[derive(Debug, Clone)]
pub struct Store {
    layout: DatasetLayout,
}

impl Store {
    pub fn new(layout: DatasetLayout) -> Self {
        Self { layout }
    }

    pub fn index_location(&self) -> &Location {
        &self.layout.index
    }

    pub fn screen_file_name(&self, id: &ScreenId) -> String {
        format!(
            "{}_{}-{}.screen.tab.txt",
            self.layout.file_prefix, id, self.layout.version
        )
    }

    pub fn screen_location(&self, id: &ScreenId) -> Location {
        self.layout.screens.join(&self.screen_file_name(id))
    }
}
