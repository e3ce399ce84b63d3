//! Package-manager invocation classification.
//!
//! Maps one command segment onto `(ecosystem, install/run targets)`. The
//! command tables mirror the ecosystems the policy service understands;
//! targets are explicit package-ish arguments only — never flags, never
//! local paths.

/// How many positional targets a matched command contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Take {
    /// Installers take every positional argument (`npm install a b c`).
    All,
    /// Runners take only the package being run (`npx prettier --write .`).
    First,
}

struct Extract<'a> {
    ecosystem: &'static str,
    take: Take,
    /// Index of the first argument to consider.
    args_from: usize,
    /// Flags whose value must be skipped along with the flag itself.
    flags_with_values: &'a [&'static str],
    /// Allow targets that start with `/` (build-system labels like
    /// `//app:main`).
    allow_rooted: bool,
}

impl<'a> Extract<'a> {
    fn new(ecosystem: &'static str, take: Take, args_from: usize) -> Self {
        Self {
            ecosystem,
            take,
            args_from,
            flags_with_values: &[],
            allow_rooted: false,
        }
    }

    fn skipping(mut self, flags: &'a [&'static str]) -> Self {
        self.flags_with_values = flags;
        self
    }

    fn rooted(mut self) -> Self {
        self.allow_rooted = true;
        self
    }
}

/// Classify a single command segment. Returns the ecosystem name and the
/// extracted targets (possibly empty when the command matched but carried no
/// positional package arguments).
pub(crate) fn classify_packages(words: &[String]) -> Option<(&'static str, Vec<String>)> {
    let rule = match_rule(words)?;
    let targets = extract_targets(words, &rule);
    Some((rule.ecosystem, targets))
}

fn arg(words: &[String], idx: usize) -> Option<&str> {
    words.get(idx).map(String::as_str)
}

#[allow(clippy::too_many_lines)]
fn match_rule<'a>(words: &[String]) -> Option<Extract<'a>> {
    let cmd = arg(words, 0)?;
    let sub = arg(words, 1);
    let rule = match (cmd, sub) {
        // Node.js
        ("npm", Some("install" | "i" | "exec")) => {
            let take = if sub == Some("exec") { Take::First } else { Take::All };
            Extract::new("node", take, 2)
        }
        ("npx", _) => Extract::new("node", Take::First, 1),
        ("pnpm", Some("install" | "i" | "add")) => Extract::new("node", Take::All, 2),
        ("pnpm", Some("dlx")) => Extract::new("node", Take::First, 2),
        ("pnpx", _) => Extract::new("node", Take::First, 1),
        ("yarn", Some("add")) => Extract::new("node", Take::All, 2),
        ("yarn", Some("global")) if arg(words, 2) == Some("add") => {
            Extract::new("node", Take::All, 3)
        }
        ("yarn", Some("dlx")) => Extract::new("node", Take::First, 2),
        ("bunx", _) => Extract::new("node", Take::First, 1),
        ("volta", Some("run")) => Extract::new("node", Take::First, 2),
        ("component", Some("install")) => Extract::new("node", Take::All, 2),
        ("volo", Some("add")) => Extract::new("node", Take::All, 2),
        ("ender", Some("build")) => Extract::new("node", Take::All, 2),

        // Python
        ("pip" | "pip3", Some("install")) => Extract::new("python", Take::All, 2)
            .skipping(&["-r", "--requirement", "-e", "--editable", "-c", "--constraint", "-i", "--index-url"]),
        ("python" | "python3", Some("-m"))
            if arg(words, 2) == Some("pip") && arg(words, 3) == Some("install") =>
        {
            Extract::new("python", Take::All, 4)
                .skipping(&["-r", "--requirement", "-e", "--editable"])
        }
        ("pipx", Some("run" | "install")) => Extract::new("python", Take::First, 2),
        ("poetry", Some("add")) => Extract::new("python", Take::All, 2),
        ("poetry", Some("run")) => Extract::new("python", Take::First, 2),
        ("uv", Some("add")) => Extract::new("python", Take::All, 2),
        ("uv", Some("pip")) if arg(words, 2) == Some("install") => {
            Extract::new("python", Take::All, 3).skipping(&["-r", "--requirement"])
        }
        ("uvx", _) => Extract::new("python", Take::First, 1),
        ("conda" | "mamba" | "micromamba", Some("install")) => {
            Extract::new("python", Take::All, 2).skipping(&["-n", "--name", "-c", "--channel"])
        }
        ("pyenv", Some("install")) => Extract::new("python", Take::All, 2),
        ("pixi", Some("run")) => Extract::new("python", Take::First, 2),

        // Deno
        ("deno", Some("run" | "install")) => {
            Extract::new("deno", Take::First, 2).skipping(&["-n", "--name"])
        }

        // Rust
        ("cargo", Some("add" | "install")) => Extract::new("rust", Take::All, 2),
        ("cargo", Some("run")) if words.iter().any(|w| w == "--example") => {
            Extract::new("rust", Take::First, 2)
        }
        ("cargo-binstall", _) => Extract::new("rust", Take::All, 1),
        ("cargo", Some("quickinstall")) => Extract::new("rust", Take::All, 2),
        ("rustup", Some("run")) => Extract::new("rust", Take::First, 2),

        // Go
        ("go", Some("install" | "run")) => Extract::new("go", Take::All, 2),

        // Ruby
        ("gem", Some("install")) => Extract::new("ruby", Take::All, 2),
        ("bundle", Some("add")) => Extract::new("ruby", Take::All, 2),
        ("bundle", Some("exec")) => Extract::new("ruby", Take::First, 2),
        ("rbenv", Some("install")) => Extract::new("ruby", Take::All, 2),

        // Java / Scala / Clojure
        ("jbang", _) => Extract::new("java", Take::First, 1),
        ("coursier" | "cs", Some("launch")) => Extract::new("java", Take::First, 2),
        ("jgo", _) => Extract::new("java", Take::First, 1),
        ("mill", Some("run")) => Extract::new("scala", Take::First, 2),
        ("ammonite" | "amm", _) => Extract::new("scala", Take::First, 1),
        ("sbt", Some("run")) => Extract::new("scala", Take::First, 2),
        ("clj", _) => Extract::new("clojure", Take::First, 1),
        ("bb" | "babashka", _) => Extract::new("clojure", Take::First, 1),

        // Nix / Guix
        ("nix", Some("run" | "shell")) => Extract::new("nix", Take::All, 2),
        ("nix-shell", _) if words.iter().any(|w| w == "-p") => {
            let after_p = words.iter().position(|w| w == "-p").map_or(1, |i| i + 1);
            Extract::new("nix", Take::All, after_p).skipping(&["--run", "--command"])
        }
        ("guix", Some("shell")) => Extract::new("guix", Take::All, 2),

        // Containers
        ("docker" | "podman", Some("run")) => Extract::new("docker", Take::First, 2),
        ("kubectl", Some("run")) => Extract::new("docker", Take::First, 2),

        // Linux app sandboxes
        ("flatpak", Some("run")) => Extract::new("linux", Take::First, 2),
        ("snap", Some("run")) => Extract::new("linux", Take::First, 2),

        // Haskell
        ("cabal", Some("run")) => Extract::new("haskell", Take::First, 2),
        ("stack", Some("run")) if words.iter().any(|w| w == "--package") => {
            let after = words.iter().position(|w| w == "--package").map_or(2, |i| i + 1);
            Extract::new("haskell", Take::All, after)
        }
        ("ghcup", Some("install")) => Extract::new("haskell", Take::All, 2),

        // OCaml
        ("opam", Some("install")) => Extract::new("ocaml", Take::All, 2),
        ("esy", _) => Extract::new("ocaml", Take::First, 1),

        // Dart / Flutter
        ("dart", Some("pub"))
            if arg(words, 2) == Some("global") && arg(words, 3) == Some("activate") =>
        {
            Extract::new("dart", Take::All, 4)
        }
        ("flutter", Some("pub")) if arg(words, 2) == Some("run") => {
            Extract::new("dart", Take::First, 3)
        }

        // PHP
        ("composer", Some("global")) if arg(words, 2) == Some("require") => {
            Extract::new("php", Take::All, 3)
        }
        ("composer", Some("require")) => Extract::new("php", Take::All, 2),
        ("phive", Some("install")) => Extract::new("php", Take::All, 2),

        // Perl
        ("cpanm", _) => Extract::new("perl", Take::All, 1),
        ("cpm", Some("install")) => Extract::new("perl", Take::All, 2),
        ("ppm", Some("install")) => Extract::new("perl", Take::All, 2),

        // Lua
        ("luarocks", Some("install")) => Extract::new("lua", Take::All, 2),

        // Swift
        ("mint", Some("run")) => Extract::new("swift", Take::First, 2),
        ("marathon", Some("run")) => Extract::new("swift", Take::First, 2),

        // WebAssembly
        ("wasmer", Some("run")) => Extract::new("wasm", Take::First, 2),
        ("wapm", Some("install")) => Extract::new("wasm", Take::All, 2),

        // C / C++
        ("conan", Some("install")) => Extract::new("cpp", Take::All, 2),
        ("vcpkg", Some("install")) => Extract::new("cpp", Take::All, 2),
        ("clib", Some("install")) => Extract::new("cpp", Take::All, 2),
        ("buckaroo", Some("install")) => Extract::new("cpp", Take::All, 2),

        // System package managers
        ("brew" | "yum" | "dnf" | "zypper" | "pkg" | "pkgin" | "opkg" | "scoop" | "winget"
        | "choco" | "chocolatey", Some("install")) => Extract::new("system", Take::All, 2),
        ("apt" | "apt-get", Some("install")) => Extract::new("system", Take::All, 2),
        ("apk", Some("add")) => Extract::new("system", Take::All, 2),
        ("pacman", Some("-S")) => Extract::new("system", Take::All, 2),
        ("emerge", _) => Extract::new("system", Take::All, 1),
        ("xbps-install", _) => Extract::new("system", Take::All, 1),

        // Version managers
        ("asdf", Some("install")) => Extract::new("version", Take::All, 2),
        ("volta", Some("install")) => Extract::new("version", Take::All, 2),
        ("fnm", Some("use")) => Extract::new("version", Take::All, 2),
        ("juliaup", Some("add")) => Extract::new("version", Take::All, 2),

        // HPC
        ("spack", Some("install")) => Extract::new("hpc", Take::All, 2),
        ("easybuild", _) => Extract::new("hpc", Take::All, 1),

        // Build systems
        ("bazel", Some("run")) => Extract::new("build", Take::First, 2).rooted(),
        ("buck2", Some("run")) => Extract::new("build", Take::First, 2).rooted(),
        ("earthly", _) => Extract::new("build", Take::First, 1).rooted(),
        ("pants", Some("run")) => Extract::new("build", Take::First, 2).rooted(),

        // Elm / Zig / Nim / Racket / Lisp / TeX
        ("elm", Some("install")) => Extract::new("elm", Take::All, 2),
        ("zig", Some("fetch")) => Extract::new("zig", Take::All, 2),
        ("nimble", Some("install")) => Extract::new("nim", Take::All, 2),
        ("raco", Some("pkg")) if arg(words, 2) == Some("install") => {
            Extract::new("racket", Take::All, 3)
        }
        ("roswell" | "ros", Some("install")) => Extract::new("lisp", Take::All, 2),
        ("quicklisp", _) => Extract::new("lisp", Take::All, 1),
        ("tlmgr", Some("install")) => Extract::new("tex", Take::All, 2),

        _ => return None,
    };
    Some(rule)
}

fn extract_targets(words: &[String], rule: &Extract<'_>) -> Vec<String> {
    let mut targets = Vec::new();
    let mut skip_next = false;
    let go_ecosystem = rule.ecosystem == "go";
    let cargo_example = words.first().map(String::as_str) == Some("cargo")
        && words.get(1).map(String::as_str) == Some("run");

    let mut args = words.iter().skip(rule.args_from).peekable();
    while let Some(token) = args.next() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if token == "--" && rule.ecosystem == "guix" {
            break;
        }
        if cargo_example {
            // Only the example name after `--example` is a target.
            if token == "--example" {
                if let Some(example) = args.peek() {
                    targets.push((*example).to_string());
                }
                break;
            }
            continue;
        }
        if let Some(image) = token.strip_prefix("--image=") {
            // kubectl-style inline image flag.
            targets.push(image.to_string());
            continue;
        }
        if token.starts_with('-') && token != "--" {
            if rule.flags_with_values.contains(&token.as_str()) {
                skip_next = true;
            }
            continue;
        }
        if token == "--" {
            continue;
        }
        if is_local_path(token) && !rule.allow_rooted {
            continue;
        }
        if go_ecosystem && !looks_like_go_module(token) {
            continue;
        }
        targets.push(token.clone());
        if rule.take == Take::First {
            break;
        }
    }
    targets
}

/// `./x` and `/x` are local paths, not package names. Build-system labels
/// (`//app:main`) opt out via `allow_rooted`.
fn is_local_path(token: &str) -> bool {
    token.starts_with("./") || token.starts_with("../") || (token.starts_with('/') && !token.starts_with("//"))
        || token == "."
}

/// `go install`/`go run` arguments must look like module paths: a dotted
/// host in the first path segment, optionally `@version` or `/...` suffixed.
fn looks_like_go_module(token: &str) -> bool {
    let path = token.split('@').next().unwrap_or(token);
    match path.split('/').next() {
        Some(host) => host.contains('.') && path.contains('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn words(cmd: &str) -> Vec<String> {
        shlex::split(cmd).unwrap()
    }

    fn targets(cmd: &str) -> (&'static str, Vec<String>) {
        classify_packages(&words(cmd)).unwrap()
    }

    #[test]
    fn runners_take_only_the_package() {
        assert_eq!(targets("npx prettier --write ."), ("node", vec!["prettier".into()]));
        assert_eq!(targets("npx -y prettier --write ."), ("node", vec!["prettier".into()]));
        assert_eq!(targets("uvx ruff check ."), ("python", vec!["ruff".into()]));
        assert_eq!(targets("pipx run pycowsay hello"), ("python", vec!["pycowsay".into()]));
        assert_eq!(targets("bunx create-next-app"), ("node", vec!["create-next-app".into()]));
        assert_eq!(targets("volta run node script.js"), ("node", vec!["node".into()]));
        assert_eq!(targets("bundle exec rails server"), ("ruby", vec!["rails".into()]));
    }

    #[test]
    fn installers_take_every_positional() {
        assert_eq!(
            targets("npm install express mongoose cors"),
            ("node", vec!["express".into(), "mongoose".into(), "cors".into()])
        );
        assert_eq!(
            targets("pip install requests numpy pandas"),
            ("python", vec!["requests".into(), "numpy".into(), "pandas".into()])
        );
    }

    #[test]
    fn scoped_versioned_and_extras_tokens_stay_whole() {
        assert_eq!(targets("npm install @babel/core"), ("node", vec!["@babel/core".into()]));
        assert_eq!(targets("npm install react@18.2.0"), ("node", vec!["react@18.2.0".into()]));
        assert_eq!(
            targets(r#"pip install "apache-airflow[postgres,google]""#),
            ("python", vec!["apache-airflow[postgres,google]".into()])
        );
        assert_eq!(
            targets("pip install 'numpy>=1.20.0'"),
            ("python", vec!["numpy>=1.20.0".into()])
        );
        assert_eq!(targets("npm install 'lodash'"), ("node", vec!["lodash".into()]));
    }

    #[test]
    fn pip_requirement_and_editable_values_are_not_packages() {
        assert_eq!(targets("pip install -e ."), ("python", vec![]));
        assert_eq!(targets("pip install -r requirements.txt"), ("python", vec![]));
        assert_eq!(
            targets("pip install -r requirements.txt requests numpy"),
            ("python", vec!["requests".into(), "numpy".into()])
        );
    }

    #[test]
    fn local_paths_are_not_packages() {
        assert_eq!(targets("npm install ./local-package"), ("node", vec![]));
    }

    #[test]
    fn python_module_pip_forms() {
        assert_eq!(targets("pip3 install requests"), ("python", vec!["requests".into()]));
        assert_eq!(targets("python -m pip install numpy"), ("python", vec!["numpy".into()]));
        assert_eq!(targets("python3 -m pip install pandas"), ("python", vec!["pandas".into()]));
        assert_eq!(targets("uv pip install fastapi"), ("python", vec!["fastapi".into()]));
        assert_eq!(targets("poetry add fastapi"), ("python", vec!["fastapi".into()]));
        assert_eq!(targets("uv add django"), ("python", vec!["django".into()]));
        assert_eq!(targets("conda install numpy"), ("python", vec!["numpy".into()]));
        assert_eq!(targets("mamba install pytorch"), ("python", vec!["pytorch".into()]));
        assert_eq!(targets("pyenv install 3.11.0"), ("python", vec!["3.11.0".into()]));
        assert_eq!(targets("pixi run python script.py"), ("python", vec!["python".into()]));
    }

    #[test]
    fn rust_forms() {
        assert_eq!(targets("cargo add serde"), ("rust", vec!["serde".into()]));
        assert_eq!(targets("cargo install ripgrep"), ("rust", vec!["ripgrep".into()]));
        assert_eq!(targets("cargo run --example demo"), ("rust", vec!["demo".into()]));
        assert_eq!(targets("cargo-binstall ripgrep"), ("rust", vec!["ripgrep".into()]));
        assert_eq!(targets("cargo quickinstall ripgrep"), ("rust", vec!["ripgrep".into()]));
        assert_eq!(
            targets("rustup run nightly cargo build"),
            ("rust", vec!["nightly".into()])
        );
    }

    #[test]
    fn go_targets_must_look_like_module_paths() {
        assert_eq!(
            targets("go install github.com/junegunn/fzf@latest"),
            ("go", vec!["github.com/junegunn/fzf@latest".into()])
        );
        assert_eq!(
            targets("go install github.com/junegunn/fzf/...@latest"),
            ("go", vec!["github.com/junegunn/fzf/...@latest".into()])
        );
        assert_eq!(
            targets("go run github.com/golang/example/hello@latest"),
            ("go", vec!["github.com/golang/example/hello@latest".into()])
        );
        // A plain file is not a module path.
        assert_eq!(targets("go run main.go"), ("go", vec![]));
    }

    #[test]
    fn container_images() {
        assert_eq!(targets("docker run python:3.11-slim"), ("docker", vec!["python:3.11-slim".into()]));
        assert_eq!(targets("docker run -it ubuntu:22.04 bash"), ("docker", vec!["ubuntu:22.04".into()]));
        assert_eq!(targets("podman run -it alpine"), ("docker", vec!["alpine".into()]));
        let (eco, images) = targets("kubectl run tmp --image=busybox -it");
        assert_eq!(eco, "docker");
        assert!(images.contains(&"busybox".to_string()) || images.contains(&"tmp".to_string()));
    }

    #[test]
    fn nix_and_guix() {
        assert_eq!(targets("nix run nixpkgs#cowsay"), ("nix", vec!["nixpkgs#cowsay".into()]));
        assert_eq!(targets("nix shell nixpkgs#ripgrep"), ("nix", vec!["nixpkgs#ripgrep".into()]));
        assert_eq!(
            targets("nix-shell -p cowsay --run 'cowsay moo'"),
            ("nix", vec!["cowsay".into()])
        );
        assert_eq!(targets("guix shell python -- python3"), ("guix", vec!["python".into()]));
    }

    #[test]
    fn jvm_family() {
        assert_eq!(targets("jbang hello.java"), ("java", vec!["hello.java".into()]));
        assert_eq!(
            targets("jbang https://github.com/user/repo/script.java"),
            ("java", vec!["https://github.com/user/repo/script.java".into()])
        );
        assert_eq!(targets("coursier launch scala3-repl"), ("java", vec!["scala3-repl".into()]));
        assert_eq!(targets("cs launch scala3-repl"), ("java", vec!["scala3-repl".into()]));
        assert_eq!(targets("jgo com.example:tool:1.0.0"), ("java", vec!["com.example:tool:1.0.0".into()]));
        assert_eq!(targets("mill run app.main"), ("scala", vec!["app.main".into()]));
        assert_eq!(targets("ammonite script.sc"), ("scala", vec!["script.sc".into()]));
        assert_eq!(targets("bb script.clj"), ("clojure", vec!["script.clj".into()]));
        assert_eq!(targets("babashka script.clj"), ("clojure", vec!["script.clj".into()]));
    }

    #[test]
    fn remaining_ecosystem_table() {
        assert_eq!(targets("gem install rails"), ("ruby", vec!["rails".into()]));
        assert_eq!(targets("bundle add rspec"), ("ruby", vec!["rspec".into()]));
        assert_eq!(targets("rbenv install 3.2.0"), ("ruby", vec!["3.2.0".into()]));
        assert_eq!(targets("flatpak run org.gnome.Calculator"), ("linux", vec!["org.gnome.Calculator".into()]));
        assert_eq!(targets("snap run discord"), ("linux", vec!["discord".into()]));
        assert_eq!(targets("cabal run exe:myapp"), ("haskell", vec!["exe:myapp".into()]));
        assert_eq!(targets("stack run --package pandoc"), ("haskell", vec!["pandoc".into()]));
        assert_eq!(
            targets("ghcup install ghc 9.4.5"),
            ("haskell", vec!["ghc".into(), "9.4.5".into()])
        );
        assert_eq!(targets("opam install dune"), ("ocaml", vec!["dune".into()]));
        assert_eq!(targets("esy @latest"), ("ocaml", vec!["@latest".into()]));
        assert_eq!(targets("dart pub global activate webdev"), ("dart", vec!["webdev".into()]));
        assert_eq!(
            targets("flutter pub run build_runner build"),
            ("dart", vec!["build_runner".into()])
        );
        assert_eq!(
            targets("composer global require phpunit/phpunit"),
            ("php", vec!["phpunit/phpunit".into()])
        );
        assert_eq!(targets("phive install phpunit"), ("php", vec!["phpunit".into()]));
        assert_eq!(targets("cpanm Mojolicious"), ("perl", vec!["Mojolicious".into()]));
        assert_eq!(targets("cpm install Plack"), ("perl", vec!["Plack".into()]));
        assert_eq!(targets("ppm install DBD-mysql"), ("perl", vec!["DBD-mysql".into()]));
        assert_eq!(targets("luarocks install moonscript"), ("lua", vec!["moonscript".into()]));
        assert_eq!(targets("mint run realm/SwiftLint"), ("swift", vec!["realm/SwiftLint".into()]));
        assert_eq!(targets("marathon run script.swift"), ("swift", vec!["script.swift".into()]));
        assert_eq!(targets("wasmer run cowsay"), ("wasm", vec!["cowsay".into()]));
        assert_eq!(targets("wapm install cowsay"), ("wasm", vec!["cowsay".into()]));
        assert_eq!(targets("conan install poco/1.12.4@"), ("cpp", vec!["poco/1.12.4@".into()]));
        assert_eq!(targets("vcpkg install boost"), ("cpp", vec!["boost".into()]));
        assert_eq!(
            targets("clib install stephenmathieson/batch.c"),
            ("cpp", vec!["stephenmathieson/batch.c".into()])
        );
        assert_eq!(
            targets("buckaroo install google/googletest"),
            ("cpp", vec!["google/googletest".into()])
        );
        assert_eq!(targets("elm install elm/http"), ("elm", vec!["elm/http".into()]));
        assert_eq!(
            targets("zig fetch --save git+https://github.com/user/repo"),
            ("zig", vec!["git+https://github.com/user/repo".into()])
        );
        assert_eq!(targets("nimble install nim"), ("nim", vec!["nim".into()]));
        assert_eq!(targets("raco pkg install drracket"), ("racket", vec!["drracket".into()]));
        assert_eq!(
            targets("roswell install fukamachi/qlot"),
            ("lisp", vec!["fukamachi/qlot".into()])
        );
        assert_eq!(
            targets("quicklisp install alexandria"),
            ("lisp", vec!["install".into(), "alexandria".into()])
        );
        assert_eq!(targets("tlmgr install babel"), ("tex", vec!["babel".into()]));
    }

    #[test]
    fn system_package_managers() {
        for (cmd, expected) in [
            ("brew install wget", "wget"),
            ("apt install curl", "curl"),
            ("apt-get install ripgrep", "ripgrep"),
            ("yum install git", "git"),
            ("dnf install nodejs", "nodejs"),
            ("pacman -S firefox", "firefox"),
            ("zypper install docker", "docker"),
            ("apk add bash", "bash"),
            ("pkg install nginx", "nginx"),
            ("emerge firefox", "firefox"),
            ("xbps-install firefox", "firefox"),
            ("pkgin install git", "git"),
            ("opkg install luci", "luci"),
            ("scoop install curl", "curl"),
            ("winget install Mozilla.Firefox", "Mozilla.Firefox"),
            ("choco install git", "git"),
            ("chocolatey install git", "git"),
        ] {
            assert_eq!(targets(cmd), ("system", vec![expected.into()]), "{cmd}");
        }
    }

    #[test]
    fn version_managers_hpc_and_build() {
        let (eco, list) = targets("asdf install nodejs 18.0.0");
        assert_eq!(eco, "version");
        assert!(list.contains(&"nodejs".to_string()));
        assert_eq!(targets("volta install node@18"), ("version", vec!["node@18".into()]));
        assert_eq!(targets("fnm use 18"), ("version", vec!["18".into()]));
        assert_eq!(targets("juliaup add 1.9"), ("version", vec!["1.9".into()]));
        assert_eq!(targets("spack install hdf5"), ("hpc", vec!["hdf5".into()]));
        assert_eq!(
            targets("easybuild TensorFlow-2.11.0.eb"),
            ("hpc", vec!["TensorFlow-2.11.0.eb".into()])
        );
        assert_eq!(targets("bazel run //my:target"), ("build", vec!["//my:target".into()]));
        assert_eq!(targets("buck2 run //app:main"), ("build", vec!["//app:main".into()]));
        assert_eq!(targets("earthly +build"), ("build", vec!["+build".into()]));
        assert_eq!(targets("pants run ::"), ("build", vec!["::".into()]));
    }

    #[test]
    fn url_targets_are_kept() {
        assert_eq!(
            targets("uvx https://github.com/jlowin/fastmcp"),
            ("python", vec!["https://github.com/jlowin/fastmcp".into()])
        );
        assert_eq!(
            targets("deno run https://deno.land/std/examples/welcome.ts"),
            ("deno", vec!["https://deno.land/std/examples/welcome.ts".into()])
        );
        assert_eq!(
            targets("deno install -n serve https://deno.land/std/http/file_server.ts"),
            ("deno", vec!["https://deno.land/std/http/file_server.ts".into()])
        );
        assert_eq!(
            targets("npm install git+https://github.com/user/repo.git"),
            ("node", vec!["git+https://github.com/user/repo.git".into()])
        );
        assert_eq!(
            targets("pip install file:///path/to/package"),
            ("python", vec!["file:///path/to/package".into()])
        );
    }

    #[test]
    fn non_package_commands_do_not_classify() {
        for cmd in [
            "cat file.txt",
            "python script.py",
            "carthage update",
            "wasm-pack build",
            "gradle run",
            "ant run",
            "depot build",
            "shards install",
            "mix run -e \"IO.puts(:hello)\"",
            "npm run build",
        ] {
            assert!(classify_packages(&words(cmd)).is_none(), "{cmd}");
        }
    }

    #[test]
    fn combined_short_flags_are_skipped() {
        assert_eq!(targets("npm i -gS typescript"), ("node", vec!["typescript".into()]));
        assert_eq!(targets("npm install -g typescript"), ("node", vec!["typescript".into()]));
        assert_eq!(targets("yarn global add eslint"), ("node", vec!["eslint".into()]));
    }
}
