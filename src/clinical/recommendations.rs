//! Workup and initial management by diagnosis family, and the list of
//! data whose absence limits the analysis.

use super::contains_word;
use crate::models::{ExtractedFindings, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiagnosisFamily {
    AcuteCoronary,
    AorticDissection,
    Pneumonia,
    PulmonaryEmbolism,
    Bronchitis,
    Reflux,
    HeartFailure,
    Other,
}

/// Checked in order; the first family that matches wins.
fn family(diagnosis: &str) -> DiagnosisFamily {
    let dx = diagnosis.to_uppercase();

    if any_term(&dx, &["ACUTE CORONARY", "MYOCARDIAL INFARCTION", "HEART ATTACK"])
        || any_word(&dx, &["ACS", "AMI", "NSTEMI", "STEMI"])
    {
        DiagnosisFamily::AcuteCoronary
    } else if dx.contains("AORTIC DISSECTION") {
        DiagnosisFamily::AorticDissection
    } else if dx.contains("PNEUMONIA") || contains_word(&dx, "CAP") {
        DiagnosisFamily::Pneumonia
    } else if dx.contains("PULMONARY EMBOLISM") || contains_word(&dx, "PE") {
        DiagnosisFamily::PulmonaryEmbolism
    } else if dx.contains("BRONCHITIS") {
        DiagnosisFamily::Bronchitis
    } else if any_term(&dx, &["GERD", "ESOPHAGEAL", "REFLUX"]) {
        DiagnosisFamily::Reflux
    } else if dx.contains("HEART FAILURE") || contains_word(&dx, "CHF") {
        DiagnosisFamily::HeartFailure
    } else {
        DiagnosisFamily::Other
    }
}

fn any_term(dx: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| dx.contains(t))
}

fn any_word(dx: &str, words: &[&str]) -> bool {
    words.iter().any(|w| contains_word(dx, w))
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn recommended_tests(diagnosis: &str) -> Vec<String> {
    let tests: &[&str] = match family(diagnosis) {
        DiagnosisFamily::AcuteCoronary => &[
            "12-lead ECG (STAT)",
            "Troponin I or T (serial measurements)",
            "CK-MB",
            "Complete metabolic panel",
            "Lipid panel",
        ],
        DiagnosisFamily::AorticDissection => &[
            "CT angiography chest (STAT)",
            "Transthoracic echocardiography",
            "Blood pressure measurement (all extremities)",
            "D-dimer",
        ],
        DiagnosisFamily::Pneumonia => &[
            "Chest X-ray (PA and lateral)",
            "CBC with differential",
            "Blood cultures (if febrile)",
            "Sputum culture and gram stain",
            "Arterial blood gas (if hypoxemic)",
        ],
        DiagnosisFamily::PulmonaryEmbolism => &[
            "D-dimer (if low/intermediate risk)",
            "CT pulmonary angiography",
            "Venous duplex ultrasound (lower extremities)",
            "ECG",
            "Arterial blood gas",
        ],
        DiagnosisFamily::Bronchitis => &[
            "Chest X-ray (if severe or prolonged)",
            "Pulse oximetry",
            "Sputum culture (if purulent)",
        ],
        DiagnosisFamily::Reflux => &[
            "Trial of PPI therapy",
            "Upper endoscopy (if alarm symptoms)",
            "Esophageal manometry (if refractory)",
            "24-hour pH monitoring",
        ],
        DiagnosisFamily::HeartFailure => &[
            "BNP or NT-proBNP",
            "Echocardiography",
            "ECG",
            "Chest X-ray",
            "Complete metabolic panel",
        ],
        DiagnosisFamily::Other => &[
            "Complete blood count (CBC)",
            "Comprehensive metabolic panel",
            "Relevant imaging based on clinical presentation",
        ],
    };
    owned(tests)
}

/// Initial steps; ACS and PE escalate when the risk band is red.
pub fn initial_management(diagnosis: &str, risk: RiskLevel) -> Vec<String> {
    let high_risk = risk == RiskLevel::Red;
    let steps: &[&str] = match family(diagnosis) {
        DiagnosisFamily::AcuteCoronary if high_risk => &[
            "Aspirin 325mg PO (chewed) immediately",
            "Sublingual nitroglycerin",
            "Oxygen if SpO2 < 94%",
            "IV access",
            "Continuous cardiac monitoring",
            "Activate cath lab (if STEMI)",
            "Heparin or LMWH anticoagulation",
        ],
        DiagnosisFamily::AcuteCoronary => &[
            "Aspirin 325mg PO",
            "Serial troponins",
            "Cardiology consultation",
            "Continuous monitoring",
        ],
        DiagnosisFamily::AorticDissection => &[
            "IV beta-blocker (labetalol) for BP control (target SBP 100-120)",
            "IV access (2 large-bore)",
            "Type and cross match blood",
            "Emergent CT surgery consultation",
            "NPO status",
            "Pain control",
        ],
        DiagnosisFamily::Pneumonia => &[
            "Oxygen therapy if SpO2 < 90%",
            "Empiric antibiotics (e.g., Ceftriaxone 1g IV + Azithromycin 500mg PO)",
            "IV fluid resuscitation if dehydrated",
            "Antipyretics for fever",
            "Reassess clinical status in 48-72h",
        ],
        DiagnosisFamily::PulmonaryEmbolism if high_risk => &[
            "Oxygen supplementation",
            "Anticoagulation (heparin bolus + infusion)",
            "Hemodynamic monitoring",
            "Consider thrombolytics if massive PE",
            "ICU admission consideration",
        ],
        DiagnosisFamily::PulmonaryEmbolism => &[
            "Anticoagulation (LMWH or DOAC)",
            "Oxygen if hypoxemic",
            "Pain control",
            "Outpatient vs inpatient based on PESI score",
        ],
        DiagnosisFamily::Bronchitis => &[
            "Symptomatic treatment (cough suppressants, expectorants)",
            "Bronchodilators if wheezing",
            "Hydration",
            "Avoid antibiotics unless bacterial superinfection suspected",
        ],
        DiagnosisFamily::Reflux => &[
            "PPI therapy (e.g., omeprazole 20mg daily)",
            "Lifestyle modifications (elevate head of bed, avoid triggers)",
            "Antacids PRN",
            "Avoid late-night meals",
        ],
        DiagnosisFamily::HeartFailure | DiagnosisFamily::Other => &[
            "Supportive care",
            "Symptomatic treatment",
            "Monitor clinical status",
            "Specialist consultation if indicated",
        ],
    };
    owned(steps)
}

/// Data that would change the differential if it were documented.
pub fn missing_information(findings: &ExtractedFindings) -> Vec<String> {
    let mut missing = Vec::new();
    let vitals = &findings.vital_signs;

    if vitals.recorded_count() < 3 {
        missing.push("Complete vital signs (BP, HR, RR, Temp, SpO2) - Critical for risk stratification");
    } else {
        if vitals.spo2.is_none() {
            missing.push("Oxygen saturation (SpO2) - Important for respiratory assessment");
        }
        if vitals.systolic_bp.is_none() {
            missing.push("Blood pressure - Critical for hemodynamic assessment");
        }
    }

    if findings.labs.is_empty() {
        missing.push(
            "Laboratory values (CBC, metabolic panel, cardiac biomarkers) - Would help confirm/rule out diagnoses",
        );
    }
    if findings.physical_exam.len() < 2 {
        missing.push("Detailed physical examination findings - Essential for clinical assessment");
    }
    let timeline_known = findings
        .temporal_pattern
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty() && !t.to_lowercase().contains("unknown"));
    if !timeline_known {
        missing.push("Precise symptom onset and progression timeline - Helps differentiate acute vs chronic conditions");
    }
    if findings.past_medical_history.is_empty() {
        missing.push("Past medical history - Risk factors would inform probability estimates");
    }
    if findings.medications.is_empty() {
        missing.push("Current medications - Important for drug interactions and underlying conditions");
    }

    owned(&missing)
}
