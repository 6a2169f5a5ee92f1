//! Information a container publishes for the platform build.

use std::collections::BTreeMap;
use std::path::PathBuf;

use apex_schema::{DepRole, ModuleKind};
use serde::Serialize;

use crate::graph::ModuleGraph;
use crate::variants::DirectDep;

/// Boot image inputs exported by a container's bootclasspath fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApexExportsInfo {
    /// Variation name of the exporting container.
    pub apex_name: String,
    /// Boot image profile produced on the host, if any fragment has one.
    pub profile_path_on_host: Option<PathBuf>,
    /// Content library name to its hidden-API encoded dex jar.
    pub library_name_to_dex_jar_path_on_host: BTreeMap<String, PathBuf>,
}

impl ApexExportsInfo {
    /// Collect the exports of the direct bootclasspath fragments.
    pub fn collect(graph: &ModuleGraph, apex_name: &str, direct: &[DirectDep]) -> Self {
        let mut info = Self {
            apex_name: apex_name.to_string(),
            ..Self::default()
        };
        for dep in direct.iter().filter(|d| d.role == DepRole::BootclasspathFragment) {
            let ModuleKind::BootclasspathFragment {
                profile_on_host,
                dex_boot_jars,
                ..
            } = &graph.module(dep.module).kind
            else {
                continue;
            };
            if info.profile_path_on_host.is_none() {
                info.profile_path_on_host = profile_on_host.clone();
            }
            info.library_name_to_dex_jar_path_on_host
                .extend(dex_boot_jars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        info
    }

    pub fn is_empty(&self) -> bool {
        self.profile_path_on_host.is_none() && self.library_name_to_dex_jar_path_on_host.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use apex_schema::Module;

    #[test]
    fn test_collect_from_fragments() {
        let mut b = GraphBuilder::new();
        let kind = ModuleKind::BootclasspathFragment {
            classpath_proto: None,
            profile_in_apex: Some("etc/boot-image.prof".into()),
            profile_on_host: Some(PathBuf::from("out/boot.prof")),
            dex_boot_jars: BTreeMap::from([
                ("core-oj".to_string(), PathBuf::from("out/hiddenapi/core-oj.jar")),
                ("core-libart".to_string(), PathBuf::from("out/hiddenapi/core-libart.jar")),
            ]),
        };
        let f = b.add_module(Module::new("art-bootclasspath-fragment", kind));
        let g = b.build();
        let direct = [DirectDep {
            role: DepRole::BootclasspathFragment,
            property: "bootclasspath_fragments",
            module: f,
        }];

        let info = ApexExportsInfo::collect(&g, "com.android.art", &direct);
        assert_eq!(info.apex_name, "com.android.art");
        assert_eq!(info.profile_path_on_host, Some(PathBuf::from("out/boot.prof")));
        assert_eq!(info.library_name_to_dex_jar_path_on_host.len(), 2);
        assert!(!info.is_empty());

        assert!(ApexExportsInfo::collect(&g, "com.android.art", &[]).is_empty());
    }
}
