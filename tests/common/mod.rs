#![allow(dead_code)]

use camino::Utf8PathBuf;
use tempfile::TempDir;

use kira_crispr_screens::app::App;
use kira_crispr_screens::config::{Config, ConfigLoader, ResolvedConfig};
use kira_crispr_screens::domain::ScreenId;
use kira_crispr_screens::source::{DataSource, LocalSource};

pub const INDEX: &str = "\
#SCREEN_ID\tCONDITION_NAME\tCELL_LINE\tORGANISM_OFFICIAL\tSCORE.1_TYPE\tSIGNIFICANCE_INDICATOR\tSIGNIFICANCE_CRITERIA\tNOTES
1\tInfluenza A\tA549\tHomo sapiens\tMAGeCK Score\tFDR\tFDR < 0.05\tindex note 1
2\tSARS-CoV-2\tCalu-3\tHomo sapiens\tLog2 FC\t-\t-\t-
3\tInfluenza A\tHEK293T\tHomo sapiens\tZ-score\tp-value\tp < 0.01\tindex note 3
4\tZika virus\tHAP1\tMus musculus\t-\t-\t-\t-
";

pub const SCREEN_1: &str = "\
OFFICIAL_SYMBOL\tHIT\tSCORE.1\tSCORE.2\tNOTES
TP53\tYES\t3.2\t0.01\tscreen note
BRCA1\tNO\t1.1\t0.4\tscreen note
";

pub const SCREEN_2: &str = "\
#SCREEN_ID\tOFFICIAL_SYMBOL\tHIT\tSCORE.1
# ranked by MAGeCK
2\tTP53\tNO\t0.5
2\tACE2\tYES\t9.1
";

pub const SCREEN_3: &str = "\
OFFICIAL_SYMBOL\tHIT\tSCORE.1
KRAS\tYES\t2.0
TP53\tYES\t4.0
";

pub struct Fixture {
    pub dir: TempDir,
    pub root: Utf8PathBuf,
}

impl Fixture {
    /// Index with screens 1–4; screen 4 has no data file.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(root.join("index.tab.txt"), INDEX).unwrap();
        for (id, content) in [(1, SCREEN_1), (2, SCREEN_2), (3, SCREEN_3)] {
            std::fs::write(
                root.join(format!("TEST-SCREEN_{id}-0.0.0.screen.tab.txt")),
                content,
            )
            .unwrap();
        }
        Self { dir, root }
    }

    pub fn config(&self) -> ResolvedConfig {
        ConfigLoader::resolve_config(Config {
            index: Some(self.root.join("index.tab.txt").to_string()),
            file_prefix: Some("TEST-SCREEN".to_string()),
            version: Some("0.0.0".to_string()),
            ..Config::default()
        })
        .unwrap()
    }

    pub fn app(&self) -> App<LocalSource> {
        App::load(self.config(), LocalSource).unwrap()
    }

    pub fn app_with<S: DataSource>(&self, source: S) -> App<S> {
        App::load(self.config(), source).unwrap()
    }
}

pub fn id(value: &str) -> ScreenId {
    value.parse().unwrap()
}

pub fn ids(values: &[&str]) -> Vec<ScreenId> {
    values.iter().map(|value| id(value)).collect()
}
