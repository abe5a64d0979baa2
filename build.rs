use std::env;
use std::process::Command;

// CPU features the compiled kernels can use. The AVX2 kernel also relies on
// FMA, so both must be present before the cfg flag is emitted.
struct CpuFeature {
    name: &'static str,
    rustc_flag: &'static str,
    cfg_flag: &'static str,
    detected: bool,
}

impl CpuFeature {
    fn features() -> Vec<CpuFeature> {
        vec![CpuFeature {
            name: "avx2",
            rustc_flag: "+avx2,+avx,+fma",
            cfg_flag: "avx2",
            detected: false,
        }]
    }
}

// Feature detection trait to keep per-OS implementations separate
trait CpuFeatureDetector {
    fn detect_features(&self, features: &mut [CpuFeature]);
    fn is_applicable(&self) -> bool;
}

struct LinuxDetector;
impl CpuFeatureDetector for LinuxDetector {
    fn detect_features(&self, features: &mut [CpuFeature]) {
        if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
            let contents = cpuinfo.to_lowercase();
            for feature in features.iter_mut() {
                feature.detected = contents.contains(feature.name) && contents.contains("fma");
            }
        }
    }

    fn is_applicable(&self) -> bool {
        cfg!(target_os = "linux")
    }
}

struct MacOSDetector;
impl CpuFeatureDetector for MacOSDetector {
    fn detect_features(&self, features: &mut [CpuFeature]) {
        let output = Command::new("sysctl").args(["-a"]).output();

        if let Ok(output) = output {
            let contents = String::from_utf8_lossy(&output.stdout).to_lowercase();

            for feature in features.iter_mut() {
                if feature.name == "avx2" {
                    feature.detected = contents.contains("hw.optional.avx2_0: 1")
                        && contents.contains("hw.optional.fma: 1");
                }
            }
        }
    }

    fn is_applicable(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

fn detect_cpu_features(features: &mut [CpuFeature]) {
    let detectors: Vec<Box<dyn CpuFeatureDetector>> =
        vec![Box::new(LinuxDetector), Box::new(MacOSDetector)];

    for detector in detectors {
        if detector.is_applicable() {
            detector.detect_features(features);
            break;
        }
    }
}

fn apply(features: &[CpuFeature]) {
    // Use the first detected feature; without one the scalar kernels are the
    // only compiled implementations.
    let cfg_flag = features
        .iter()
        .find(|cpu_feature| cpu_feature.detected)
        .map(|cpu_feature| {
            println!("cargo:rustc-flag=-C");
            println!("cargo:rustc-flag=target-feature={}", cpu_feature.rustc_flag);
            cpu_feature.cfg_flag
        })
        .unwrap_or("fallback");

    println!("cargo:rustc-cfg={cfg_flag}");

    println!("cargo::rustc-check-cfg=cfg(avx2)");
    println!("cargo::rustc-check-cfg=cfg(fallback)");
}

fn main() {
    let mut features = CpuFeature::features();

    // Only run CPU detection for native builds
    let host = env::var("HOST").unwrap_or_default();
    let target = env::var("TARGET").unwrap_or_default();

    if host == target {
        detect_cpu_features(&mut features);
    }

    apply(&features);
}
