//! The service bundle: process-wide state with an explicit start/shutdown
//! lifecycle. Construction wires nothing; `start` brings services up in
//! dependency order, and module load/unload flows through here so every
//! cache is invalidated in one place.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context as _};
use aurora_core::gff::Gff;
use aurora_core::resref::{Resource, ResourceType, Resref};

use crate::config::{Config, PathAlias};
use crate::effects::EffectSystem;
use crate::models::{ModelCache, TilesetRegistry};
use crate::objects::area::Area;
use crate::objects::common::ObjectHandle;
use crate::objects::module::Module;
use crate::objects::{GameObject, ObjectManager};
use crate::profiles::GameProfile;
use crate::resources::nwsync::NWSyncManifest;
use crate::resources::{Directory, Erf, Key, ResourceManager, Zip};
use crate::rules::Rules;
use crate::scripts::ParsedScriptCache;
use crate::strings::Strings;
use crate::twoda_cache::TwoDACache;

pub struct Services {
    pub config: Config,
    pub strings: Strings,
    pub resman: ResourceManager,
    pub rules: Rules,
    pub objects: ObjectManager,
    pub effects: EffectSystem,
    pub twodas: TwoDACache,
    pub scripts: ParsedScriptCache,
    pub models: ModelCache,
    pub tilesets: TilesetRegistry,
    module: Option<ObjectHandle>,
    // Container-stack depth before the module's containers were pushed.
    module_container_base: Option<usize>,
    started: bool,
}

impl Services {
    pub fn new(config: Config) -> Services {
        Services {
            config,
            strings: Strings::new(),
            resman: ResourceManager::new(),
            rules: Rules::new(),
            objects: ObjectManager::new(),
            effects: EffectSystem::new(),
            twodas: TwoDACache::new(),
            scripts: ParsedScriptCache::new(),
            models: ModelCache::new(),
            tilesets: TilesetRegistry::new(),
            module: None,
            module_container_base: None,
            started: false,
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// Brings services up in dependency order: strings, resources, rules,
    /// objects, effects. The only abort path of the core.
    pub fn start(&mut self, profile: &dyn GameProfile) -> anyhow::Result<()> {
        if self.started {
            log::warn!("kernel: services already started");
            return Ok(());
        }
        log::info!("kernel: starting services with profile {}", profile.name());

        // Strings.
        let dialog = self
            .config
            .install_path()
            .join("lang")
            .join("en")
            .join("data")
            .join("dialog.tlk");
        if dialog.is_file() && !self.strings.load_dialog_tlk(&dialog) {
            log::error!("kernel: unable to load strings service");
            bail!("invalid dialog.tlk at {}", dialog.display());
        }

        // Resources: base keys under the install, then user-level layers.
        let data_dir = self.config.install_path().join("data");
        if let Ok(entries) = fs::read_dir(&data_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("key")) {
                    match Key::new(&path) {
                        Ok(key) => {
                            self.resman.add_container(Box::new(key));
                        }
                        Err(err) => log::error!("kernel: {err:#}"),
                    }
                }
            }
        }
        for alias in [PathAlias::Override, PathAlias::Development] {
            let dir = self.config.alias_path(alias);
            if dir.is_dir() {
                self.resman.add_container(Box::new(Directory::new(&dir)));
            }
        }

        // Rules, objects, effects.
        if !profile.load_rules(&mut self.rules, &mut self.twodas, &self.resman) {
            log::warn!("kernel: profile rules tables incomplete");
        }
        if !profile.load_effects(&mut self.effects, &mut self.twodas, &self.resman) {
            log::error!("kernel: unable to load effects service");
            bail!("profile {} failed to register effects", profile.name());
        }

        self.started = true;
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        self.unload_module();
        self.objects.clear();
        self.effects.clear();
        self.rules.clear_tables();
        self.resman.truncate(0);
        self.twodas.clear();
        self.scripts.clear();
        self.models.clear();
        self.tilesets.clear();
        self.started = false;
        log::info!("kernel: services shut down");
    }

    /// Handle of the loaded module object, if any.
    pub fn module(&self) -> Option<ObjectHandle> {
        self.module
    }

    /// Resolves a module source: an existing path, or a name under the
    /// modules alias as `.mod`, a directory, or `.zip`.
    fn resolve_module_source(&self, source: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(source);
        if direct.exists() {
            return Some(direct);
        }
        let modules = self.config.alias_path(PathAlias::Modules);
        for candidate in [
            modules.join(format!("{source}.mod")),
            modules.join(source),
            modules.join(format!("{source}.zip")),
        ] {
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    fn push_module_container(&mut self, path: &Path) -> anyhow::Result<()> {
        let added = if path.is_dir() {
            self.resman.add_container(Box::new(Directory::new(path)))
        } else {
            match path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .as_deref()
            {
                Some("zip") => self.resman.add_container(Box::new(Zip::new(path)?)),
                _ => self.resman.add_container(Box::new(Erf::new(path)?)),
            }
        };
        if !added {
            bail!("module container {} rejected", path.display());
        }
        Ok(())
    }

    /// Loads a module: its containers are pushed onto the resource stack
    /// (manifest lowest, then the module, then its haks), the custom talk
    /// table attaches, and every area instantiates its creatures.
    pub fn load_module(
        &mut self,
        source: &str,
        manifest: Option<Rc<NWSyncManifest>>,
    ) -> anyhow::Result<ObjectHandle> {
        if self.module.is_some() {
            self.unload_module();
        }
        let path = self
            .resolve_module_source(source)
            .with_context(|| format!("no module source for {source}"))?;

        let base = self.resman.container_count();
        let result = self.load_module_inner(&path, manifest);
        match &result {
            Ok(_) => self.module_container_base = Some(base),
            Err(_) => {
                // Roll back everything the failed load stacked up.
                self.resman.truncate(base);
                self.strings.unload_custom_tlk();
            }
        }
        result
    }

    fn load_module_inner(
        &mut self,
        path: &Path,
        manifest: Option<Rc<NWSyncManifest>>,
    ) -> anyhow::Result<ObjectHandle> {
        if let Some(manifest) = manifest {
            self.resman.add_container(manifest);
        }
        self.push_module_container(path)?;

        let ifo = self
            .resman
            .demand(&Resource::new(Resref::from("module"), ResourceType::Ifo));
        if ifo.is_empty() {
            bail!("module {} has no module.ifo", path.display());
        }
        let gff = Gff::from_bytes(&ifo.bytes);
        let mut module = Module::from_gff(&gff.toplevel())
            .with_context(|| format!("corrupt module.ifo in {}", path.display()))?;

        for hak in &module.haks {
            let hak_path = self.config.alias_path(PathAlias::Hak).join(format!("{hak}.hak"));
            match Erf::new(&hak_path) {
                Ok(erf) => {
                    self.resman.add_container(Box::new(erf));
                }
                Err(err) => log::warn!("kernel: hak {}: {err:#}", hak),
            }
        }

        if let Some(tlk) = &module.custom_tlk {
            let tlk_path = self.config.alias_path(PathAlias::Tlk).join(format!("{tlk}.tlk"));
            if tlk_path.is_file() {
                self.strings.load_custom_tlk(&tlk_path);
            } else {
                log::warn!("kernel: custom tlk {} not found", tlk);
            }
        }

        for area_resref in module.area_resrefs.clone() {
            match self.load_area(area_resref) {
                Some(handle) => module.areas.push(handle),
                None => log::error!("kernel: area {} failed to load", area_resref),
            }
        }

        let handle = self.objects.insert(GameObject::Module(module));
        self.module = Some(handle);
        Ok(handle)
    }

    fn load_area(&mut self, resref: Resref) -> Option<ObjectHandle> {
        let are = self
            .resman
            .demand(&Resource::new(resref, ResourceType::Are));
        if are.is_empty() {
            return None;
        }
        let are_gff = Gff::from_bytes(&are.bytes);
        if !are_gff.valid() {
            return None;
        }
        let mut area = Area::from_gff(&are_gff.toplevel())?;

        let git = self
            .resman
            .demand(&Resource::new(resref, ResourceType::Git));
        if !git.is_empty() {
            let git_gff = Gff::from_bytes(&git.bytes);
            if git_gff.valid() {
                for template in Area::instance_resrefs(&git_gff.toplevel()) {
                    match self.objects.load_creature(&self.resman, template.view()) {
                        Some(h) => area.creatures.push(h),
                        None => log::warn!("kernel: creature {} failed to spawn", template),
                    }
                }
            }
        }
        Some(self.objects.insert(GameObject::Area(area)))
    }

    /// Tears down the module: the object tree, its containers, and every
    /// cache, wholesale.
    pub fn unload_module(&mut self) {
        if let Some(handle) = self.module.take() {
            self.objects.destroy(handle);
        }
        if let Some(base) = self.module_container_base.take() {
            self.resman.truncate(base);
        }
        self.objects.clear();
        self.effects.clear_pool();
        self.rules.clear_tables();
        self.twodas.clear();
        self.scripts.clear();
        self.models.clear();
        self.tilesets.clear();
        self.strings.clear_module_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::nwn1::{self, Nwn1Profile};
    use crate::resources::erf::test_support::build_erf;
    use crate::resources::nwsync::test_support::{store_blob, store_manifest};
    use crate::resources::NWSync;
    use aurora_core::gff::{GffBuilder, GffValue};
    use aurora_core::tlk::Tlk;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("{prefix}_{pid}_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn chicken_utc() -> Vec<u8> {
        let mut b = GffBuilder::new("UTC");
        let root = b.root();
        b.add(root, "TemplateResRef", GffValue::Resref("nw_chicken".into()));
        b.add(root, "Tag", GffValue::String("NW_CHICKEN".into()));
        b.add(root, "Gender", GffValue::Byte(1));
        b.add(root, "Dex", GffValue::Byte(7));
        b.add(root, "Con", GffValue::Byte(10));
        b.add(root, "Appearance_Type", GffValue::Word(31));
        b.add(root, "ScriptAttacked", GffValue::Resref("nw_c2_default5".into()));
        b.to_bytes()
    }

    fn start_are() -> Vec<u8> {
        let mut b = GffBuilder::new("ARE");
        let root = b.root();
        b.add(root, "ResRef", GffValue::Resref("start".into()));
        b.add(root, "Tag", GffValue::String("START".into()));
        b.to_bytes()
    }

    fn start_git(creatures: usize) -> Vec<u8> {
        let mut b = GffBuilder::new("GIT");
        let root = b.root();
        let list = b.add_list(root, "Creature List");
        for _ in 0..creatures {
            let s = b.list_append(list, 4);
            b.add(s, "TemplateResRef", GffValue::Resref("nw_chicken".into()));
        }
        b.to_bytes()
    }

    fn module_ifo() -> Vec<u8> {
        crate::objects::module::test_support::build_ifo(&["start"], &[], None).to_bytes()
    }

    fn res(name: &str, ty: ResourceType) -> Resource {
        Resource::new(Resref::from(name), ty)
    }

    /// A user directory holding `modules/demo/` as a directory module.
    fn user_with_dir_module() -> PathBuf {
        let user = unique_temp_dir("services");
        let module_dir = user.join("modules").join("demo");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join("module.ifo"), module_ifo()).unwrap();
        fs::write(module_dir.join("start.are"), start_are()).unwrap();
        fs::write(module_dir.join("start.git"), start_git(2)).unwrap();
        fs::write(module_dir.join("nw_chicken.utc"), chicken_utc()).unwrap();
        user
    }

    fn started_services(user: &Path) -> Services {
        let mut services = Services::new(Config::new(user.join("install"), user));
        services.start(&Nwn1Profile).unwrap();
        services
    }

    #[test]
    fn load_module_from_directory() {
        let user = user_with_dir_module();
        let mut services = started_services(&user);

        let handle = services.load_module("demo", None).unwrap();
        let module = services.objects.get(handle).unwrap().as_module().unwrap();
        assert_eq!(module.area_count(), 1);

        let area_handle = module.get_area(0).unwrap();
        let area = services.objects.get(area_handle).unwrap().as_area().unwrap();
        assert_eq!(area.common.resref, "start");
        assert_eq!(area.creatures.len(), 2);

        // Blueprints resolve through the module container.
        let cre_handle = services
            .objects
            .load_creature(&services.resman, "nw_chicken")
            .unwrap();
        let cre = services.objects.creature(cre_handle).unwrap();
        assert_eq!(cre.stats.get_ability_score(nwn1::ABILITY_DEXTERITY), 7);
        assert_eq!(cre.scripts.on_attacked, "nw_c2_default5");
        assert_eq!(cre.appearance.id, 31);
        assert_eq!(cre.gender, 1);

        assert!(services.load_module("absent", None).is_err());
    }

    #[test]
    fn load_module_from_erf_and_zip() {
        let user = unique_temp_dir("services_erf");
        let modules = user.join("modules");
        fs::create_dir_all(&modules).unwrap();

        let entries = [
            (res("module", ResourceType::Ifo), module_ifo()),
            (res("start", ResourceType::Are), start_are()),
            (res("start", ResourceType::Git), start_git(1)),
            (res("nw_chicken", ResourceType::Utc), chicken_utc()),
        ];
        let borrowed: Vec<(Resource, &[u8])> =
            entries.iter().map(|(r, b)| (*r, b.as_slice())).collect();
        fs::write(modules.join("DockerDemo.mod"), build_erf(b"MOD ", &borrowed)).unwrap();

        let mut services = started_services(&user);
        let handle = services.load_module("DockerDemo", None).unwrap();
        let module = services.objects.get(handle).unwrap().as_module().unwrap();
        assert_eq!(module.area_count(), 1);
        let area_handle = module.get_area(0).unwrap();
        let area = services.objects.get(area_handle).unwrap().as_area().unwrap();
        assert_eq!(area.common.resref, "start");
        services.unload_module();

        crate::resources::zipfile::test_support::write_zip(
            &modules.join("zipmod.zip"),
            &[
                ("demo/module.ifo", &module_ifo()),
                ("demo/start.are", &start_are()),
                ("demo/start.git", &start_git(1)),
                ("demo/nw_chicken.utc", &chicken_utc()),
            ],
        );
        let handle = services.load_module("zipmod", None).unwrap();
        let module = services.objects.get(handle).unwrap().as_module().unwrap();
        assert_eq!(module.area_count(), 1);
    }

    #[test]
    fn haks_and_custom_tlk_attach() {
        let user = unique_temp_dir("services_hak");
        let modules = user.join("modules");
        let hak_dir = user.join("hak");
        let tlk_dir = user.join("tlk");
        fs::create_dir_all(&modules).unwrap();
        fs::create_dir_all(&hak_dir).unwrap();
        fs::create_dir_all(&tlk_dir).unwrap();

        // The hak shadows the module's own chicken blueprint.
        let mut hak_chicken_builder = GffBuilder::new("UTC");
        let root = hak_chicken_builder.root();
        hak_chicken_builder.add(root, "TemplateResRef", GffValue::Resref("nw_chicken".into()));
        hak_chicken_builder.add(root, "Tag", GffValue::String("HAK_CHICKEN".into()));
        hak_chicken_builder.add(root, "Dex", GffValue::Byte(18));
        let hak_chicken = hak_chicken_builder.to_bytes();
        let hak_entries = [(res("nw_chicken", ResourceType::Utc), hak_chicken.as_slice())];
        fs::write(hak_dir.join("ruleset.hak"), build_erf(b"HAK ", &hak_entries)).unwrap();

        let mut custom = Tlk::new(0);
        custom.set(7, "From the custom table");
        custom.save_as(tlk_dir.join("demo_tlk.tlk")).unwrap();

        let ifo = crate::objects::module::test_support::build_ifo(
            &["start"],
            &["ruleset"],
            Some("demo_tlk"),
        )
        .to_bytes();
        let module_dir = modules.join("demo");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join("module.ifo"), ifo).unwrap();
        fs::write(module_dir.join("start.are"), start_are()).unwrap();
        fs::write(module_dir.join("nw_chicken.utc"), chicken_utc()).unwrap();

        let mut services = started_services(&user);
        services.load_module("demo", None).unwrap();

        // Hak wins over the module blueprint.
        let handle = services
            .objects
            .load_creature(&services.resman, "nw_chicken")
            .unwrap();
        let cre = services.objects.creature(handle).unwrap();
        assert_eq!(cre.common.tag, "HAK_CHICKEN");
        assert_eq!(cre.stats.get_ability_score(nwn1::ABILITY_DEXTERITY), 18);

        assert_eq!(services.strings.get(0x0100_0007), "From the custom table");

        services.unload_module();
        assert_eq!(services.strings.get(0x0100_0007), "");
    }

    #[test]
    fn nwsync_manifest_feeds_the_module_stack() {
        let user = user_with_dir_module();
        // The directory module lacks this blueprint; the manifest has it.
        let module_dir = user.join("modules").join("demo");
        fs::remove_file(module_dir.join("nw_chicken.utc")).unwrap();

        let sync_root = user.join("nwsync");
        let sha = store_blob(&sync_root, &chicken_utc(), true);
        store_manifest(&sync_root, "m0", &[("nw_chicken.utc".to_string(), sha)]);

        let sync = NWSync::new(&sync_root);
        assert!(sync.is_loaded());
        let manifest = sync.get(&sync.manifests()[0].clone()).unwrap();

        let mut services = started_services(&user);
        let handle = services.load_module("demo", Some(manifest)).unwrap();
        let module = services.objects.get(handle).unwrap().as_module().unwrap();
        assert_eq!(module.area_count(), 1);

        let cre = services
            .objects
            .load_creature(&services.resman, "nw_chicken")
            .unwrap();
        assert!(services.objects.valid(cre));
    }

    #[test]
    fn haste_apply_remove_through_services() {
        let user = user_with_dir_module();
        let mut services = started_services(&user);
        services.load_module("demo", None).unwrap();

        let eff = nwn1::effect_haste(&mut services.effects);
        let handle = services
            .objects
            .load_creature(&services.resman, "nw_chicken")
            .unwrap();

        let obj = services.objects.get_mut(handle).unwrap();
        assert!(services.effects.apply(obj, eff));
        assert_eq!(obj.as_creature().unwrap().hasted, 1);
        assert_eq!(obj.effects().len(), 1);

        // Re-application is a no-op.
        assert!(!services.effects.apply(obj, eff));
        assert_eq!(obj.effects().len(), 1);

        assert!(services.effects.remove(obj, eff));
        assert_eq!(obj.as_creature().unwrap().hasted, 0);
        assert_eq!(obj.effects().len(), 0);
        assert!(!services.effects.remove(obj, eff));
    }

    #[test]
    fn unload_module_invalidates_caches() {
        let user = user_with_dir_module();
        fs::write(
            user.join("modules").join("demo").join("feat.2da"),
            "2DA V2.0\n\n   LABEL  FEAT\n0  Alert  100\n",
        )
        .unwrap();

        let mut services = started_services(&user);
        services.load_module("demo", None).unwrap();

        assert!(services.twodas.get(&services.resman, "feat").is_some());
        let handle = services
            .objects
            .load_creature(&services.resman, "nw_chicken")
            .unwrap();

        services.unload_module();
        assert!(services.module().is_none());
        assert!(!services.objects.valid(handle));
        assert!(services.twodas.is_empty());
        assert!(services.twodas.get(&services.resman, "feat").is_none());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let user = user_with_dir_module();
        let mut services = started_services(&user);
        assert!(services.started());
        services.load_module("demo", None).unwrap();
        services.shutdown();
        assert!(!services.started());
        services.shutdown();
        assert_eq!(services.resman.container_count(), 0);
    }
}
