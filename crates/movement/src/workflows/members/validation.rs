//! Member field rules shared by direct registration and recovery completion.

use super::domain::{work_email_for, MemberProfile, NewMember};
use crate::validation::{require_email, require_member_phone, require_text, ValidationError};

fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

pub fn normalize_profile(mut profile: MemberProfile) -> MemberProfile {
    trim(&mut profile.first_name);
    trim(&mut profile.last_name);
    trim(&mut profile.gender);
    trim(&mut profile.nationality);
    trim(&mut profile.phone_number);
    trim(&mut profile.residential_address);
    trim(&mut profile.emergency_contact.name);
    trim(&mut profile.emergency_contact.relationship);
    trim(&mut profile.education.highest_level);
    trim(&mut profile.education.institution_name);
    trim(&mut profile.education.field_of_study);
    profile.work_email = profile
        .work_email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty());
    profile
}

pub fn validate_profile(profile: &MemberProfile) -> Result<(), ValidationError> {
    require_text("firstName", &profile.first_name)?;
    require_text("lastName", &profile.last_name)?;
    require_text("gender", &profile.gender)?;
    require_text("nationality", &profile.nationality)?;
    require_member_phone("phoneNumber", &profile.phone_number)?;
    require_text("residentialAddress", &profile.residential_address)?;
    require_text("emergencyContact.name", &profile.emergency_contact.name)?;
    require_text(
        "emergencyContact.relationship",
        &profile.emergency_contact.relationship,
    )?;
    require_text("education.highestLevel", &profile.education.highest_level)?;
    require_text("education.institutionName", &profile.education.institution_name)?;
    require_text("education.fieldOfStudy", &profile.education.field_of_study)?;
    Ok(())
}

/// Validate the profile and resolve the work email, generating it unless one on the
/// organisation domain was supplied.
pub fn prepare_member(
    email: &str,
    profile: MemberProfile,
    domain: &str,
) -> Result<NewMember, ValidationError> {
    let email = email.trim().to_lowercase();
    require_email("email", &email)?;
    let mut profile = normalize_profile(profile);
    validate_profile(&profile)?;

    let work_email = match profile.work_email.take() {
        Some(supplied) => {
            require_email("workEmail", &supplied)?;
            let on_domain = supplied
                .rsplit_once('@')
                .is_some_and(|(_, host)| host.eq_ignore_ascii_case(domain));
            if !on_domain {
                return Err(ValidationError::new(
                    "workEmail",
                    format!("must be a @{domain} address"),
                ));
            }
            supplied
        }
        None => work_email_for(&profile.first_name, &profile.last_name, domain),
    };
    profile.work_email = Some(work_email.clone());

    Ok(NewMember {
        email,
        work_email,
        profile,
    })
}
